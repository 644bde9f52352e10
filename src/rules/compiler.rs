use ahash::AHashSet;
use serde_json::{Map, Value};

use crate::domain::{Decision, FieldPath};

use super::compare::type_name;
use super::error::CompileError;
use super::node::{Composite, Condition, Mode, Node, Operator};
use super::{Rule, RuleSet};

/// Default cap on condition nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Compiles declarative rule specifications into a [`RuleSet`].
///
/// Each specification is a mapping:
///
/// ```yaml
/// - name: flag_high_value_eur
///   when:
///     all:
///       - field: amount
///         op: gt
///         value: 100000
///       - field: currency
///         op: eq
///         value: "EUR"
///   action: flag
///   priority: 10
/// ```
///
/// A missing or empty `when` matches every transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCompiler {
    max_depth: usize,
}

impl Default for RuleCompiler {
    fn default() -> Self {
        RuleCompiler {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RuleCompiler {
    pub fn new() -> Self {
        RuleCompiler::default()
    }

    /// Set the maximum condition nesting depth (at least 1).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Compile a sequence of rule specifications.
    ///
    /// Fails on the first malformed rule; no partial rule set is produced.
    pub fn compile(&self, spec: &Value) -> Result<RuleSet, CompileError> {
        let specs = spec
            .as_array()
            .ok_or(CompileError::NotASequence(type_name(spec)))?;

        let mut seen = AHashSet::with_capacity(specs.len());
        let mut rules = Vec::with_capacity(specs.len());

        for (index, rule_spec) in specs.iter().enumerate() {
            let rule = self.compile_rule(index, rule_spec)?;
            if !seen.insert(rule.name.clone()) {
                return Err(CompileError::DuplicateRule(rule.name));
            }
            rules.push(rule);
        }

        Ok(RuleSet::new(rules))
    }

    /// Compile a single rule specification. `index` labels errors for
    /// rules without a usable name.
    pub fn compile_rule(&self, index: usize, spec: &Value) -> Result<Rule, CompileError> {
        let label = format!("#{}", index + 1);

        let map = spec.as_object().ok_or_else(|| {
            CompileError::malformed(
                &label,
                format!("rule must be a mapping, found {}", type_name(spec)),
            )
        })?;

        let name = match map.get("name") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(_) => return Err(CompileError::malformed(&label, "`name` must be a non-empty string")),
            None => return Err(CompileError::malformed(&label, "missing `name`")),
        };

        let action = match map.get("action") {
            Some(Value::String(s)) => Decision::parse(s).ok_or_else(|| {
                CompileError::malformed(
                    &name,
                    format!("unknown action {s:?}, expected allow, flag or block"),
                )
            })?,
            Some(other) => {
                return Err(CompileError::malformed(
                    &name,
                    format!("`action` must be a string, found {}", type_name(other)),
                ))
            }
            None => return Err(CompileError::malformed(&name, "missing `action`")),
        };

        let priority = match map.get("priority") {
            None => 0,
            Some(value) => coerce_priority(value).ok_or_else(|| {
                CompileError::malformed(&name, format!("`priority` is not an integer: {value}"))
            })?,
        };

        let root = self.compile_when(&name, map.get("when"))?;

        let description = map
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Rule {
            name,
            root,
            action,
            priority,
            description,
        })
    }

    fn compile_when(&self, rule: &str, when: Option<&Value>) -> Result<Node, CompileError> {
        match when {
            None | Some(Value::Null) => Ok(Node::Always),
            Some(Value::Object(map)) if map.is_empty() => Ok(Node::Always),
            Some(spec) => self.compile_node(rule, spec, 1),
        }
    }

    fn compile_node(&self, rule: &str, spec: &Value, depth: usize) -> Result<Node, CompileError> {
        if depth > self.max_depth {
            return Err(CompileError::DepthExceeded {
                rule: rule.to_string(),
                limit: self.max_depth,
            });
        }

        let map = spec.as_object().ok_or_else(|| {
            CompileError::malformed(
                rule,
                format!("condition must be a mapping, found {}", type_name(spec)),
            )
        })?;

        match (map.get("all"), map.get("any")) {
            (Some(_), Some(_)) => Err(CompileError::malformed(
                rule,
                "condition cannot combine `all` and `any`",
            )),
            (Some(children), None) => self.compile_composite(rule, Mode::All, children, depth),
            (None, Some(children)) => self.compile_composite(rule, Mode::Any, children, depth),
            (None, None) => compile_condition(rule, map).map(Node::Condition),
        }
    }

    fn compile_composite(
        &self,
        rule: &str,
        mode: Mode,
        children: &Value,
        depth: usize,
    ) -> Result<Node, CompileError> {
        let specs = children.as_array().ok_or_else(|| {
            CompileError::malformed(
                rule,
                format!(
                    "`{}` must be a sequence of conditions, found {}",
                    mode.as_str(),
                    type_name(children)
                ),
            )
        })?;

        let children = specs
            .iter()
            .map(|child| self.compile_node(rule, child, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Node::Composite(Composite::new(mode, children)))
    }
}

fn compile_condition(rule: &str, map: &Map<String, Value>) -> Result<Condition, CompileError> {
    let field = match map.get("field") {
        Some(Value::String(s)) => FieldPath::parse(s)
            .ok_or_else(|| CompileError::malformed(rule, format!("invalid field path {s:?}")))?,
        Some(other) => {
            return Err(CompileError::malformed(
                rule,
                format!("`field` must be a string, found {}", type_name(other)),
            ))
        }
        None => return Err(CompileError::malformed(rule, "condition is missing `field`")),
    };

    let op = match map.get("op") {
        Some(Value::String(s)) => Operator::parse(s).ok_or_else(|| CompileError::UnknownOperator {
            rule: rule.to_string(),
            op: s.clone(),
        })?,
        Some(other) => {
            return Err(CompileError::UnknownOperator {
                rule: rule.to_string(),
                op: other.to_string(),
            })
        }
        None => return Err(CompileError::malformed(rule, "condition is missing `op`")),
    };

    let operand = map
        .get("value")
        .ok_or_else(|| CompileError::malformed(rule, "condition is missing `value`"))?;

    if !op.accepts_operand(operand) {
        return Err(CompileError::malformed(
            rule,
            format!("operator {op} cannot take a {} operand", type_name(operand)),
        ));
    }

    Ok(Condition::new(field, op, operand.clone()))
}

/// Coerce a priority to an integer: integers, integral floats, and
/// strings holding an integer are accepted.
fn coerce_priority(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Compile a rule set with the default compiler settings.
pub fn compile_ruleset(spec: &Value) -> Result<RuleSet, CompileError> {
    RuleCompiler::default().compile(spec)
}
