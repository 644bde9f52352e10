use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::domain::{FieldPath, Transaction};

use super::compare::{self, type_name};
use super::error::TypeMismatch;

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    In,
}

impl Operator {
    /// Parse an operator name as written in policy files.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gt" => Some(Operator::Gt),
            "lt" => Some(Operator::Lt),
            "eq" => Some(Operator::Eq),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Eq => "eq",
            Operator::In => "in",
        }
    }

    /// Whether `operand` is a shape this operator can ever succeed with.
    pub fn accepts_operand(&self, operand: &Value) -> bool {
        match self {
            Operator::Gt | Operator::Lt => {
                matches!(operand, Value::Number(_) | Value::String(_) | Value::Bool(_))
            }
            Operator::Eq => true,
            Operator::In => {
                matches!(operand, Value::Array(_) | Value::String(_) | Value::Object(_))
            }
        }
    }

    /// Apply the operator. Returns None when the operands are incompatible.
    fn apply(&self, value: &Value, operand: &Value) -> Option<bool> {
        match self {
            Operator::Gt => compare::compare(value, operand).map(|o| o == Ordering::Greater),
            Operator::Lt => compare::compare(value, operand).map(|o| o == Ordering::Less),
            Operator::Eq => Some(compare::equals(value, operand)),
            Operator::In => compare::contains(operand, value),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf test of one transaction field.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: FieldPath,
    pub op: Operator,
    pub operand: Value,
}

impl Condition {
    pub fn new(field: FieldPath, op: Operator, operand: Value) -> Self {
        Condition { field, op, operand }
    }

    /// Evaluate against a transaction.
    ///
    /// An absent or null field never matches.
    pub fn evaluate(&self, tx: &Transaction) -> Result<bool, TypeMismatch> {
        let value = match tx.resolve(&self.field) {
            Some(v) if !v.is_null() => v,
            _ => return Ok(false),
        };

        self.op
            .apply(value, &self.operand)
            .ok_or_else(|| TypeMismatch {
                field: self.field.to_string(),
                op: self.op,
                found: type_name(value),
                operand: type_name(&self.operand),
            })
    }
}

/// How a composite combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    All,
    Any,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::All => "all",
            Mode::Any => "any",
        }
    }
}

/// Boolean combinator over child nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub mode: Mode,
    pub children: Vec<Node>,
}

impl Composite {
    pub fn new(mode: Mode, children: Vec<Node>) -> Self {
        Composite { mode, children }
    }

    /// Evaluate children in order, stopping once the outcome is decided.
    pub fn evaluate(&self, tx: &Transaction) -> Result<bool, TypeMismatch> {
        match self.mode {
            Mode::All => {
                for child in &self.children {
                    if !child.evaluate(tx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Mode::Any => {
                for child in &self.children {
                    if child.evaluate(tx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// Node of a rule's condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Matches every transaction (rules without a `when` clause)
    Always,
    Condition(Condition),
    Composite(Composite),
}

impl Node {
    pub fn evaluate(&self, tx: &Transaction) -> Result<bool, TypeMismatch> {
        match self {
            Node::Always => Ok(true),
            Node::Condition(c) => c.evaluate(tx),
            Node::Composite(c) => c.evaluate(tx),
        }
    }

    /// Nesting depth of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Node::Always | Node::Condition(_) => 1,
            Node::Composite(c) => 1 + c.children.iter().map(Node::depth).max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(field: &str, op: Operator, operand: Value) -> Node {
        Node::Condition(Condition::new(FieldPath::parse(field).unwrap(), op, operand))
    }

    fn tx(value: Value) -> Transaction {
        Transaction::new(value)
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!(Operator::parse("gt"), Some(Operator::Gt));
        assert_eq!(Operator::parse("in"), Some(Operator::In));
        assert_eq!(Operator::parse("GT"), None);
        assert_eq!(Operator::parse("gte"), None);
    }

    #[test]
    fn test_missing_field_never_matches() {
        let node = cond("originator.kyc", Operator::Eq, json!(false));
        assert_eq!(node.evaluate(&tx(json!({"amount": 5}))), Ok(false));

        // Not even for an ordering test against an incompatible operand
        let node = cond("amount", Operator::Gt, json!("x"));
        assert_eq!(node.evaluate(&tx(json!({}))), Ok(false));
    }

    #[test]
    fn test_null_field_never_matches() {
        let node = cond("context", Operator::Eq, json!("Standard"));
        assert_eq!(node.evaluate(&tx(json!({"context": null}))), Ok(false));
    }

    #[test]
    fn test_nested_eq_false() {
        let node = cond("originator.kyc", Operator::Eq, json!(false));
        assert_eq!(node.evaluate(&tx(json!({"originator": {"kyc": false}}))), Ok(true));
        assert_eq!(node.evaluate(&tx(json!({"originator": {"kyc": true}}))), Ok(false));
    }

    #[test]
    fn test_gt_lt() {
        let gt = cond("amount", Operator::Gt, json!(100000));
        let lt = cond("amount", Operator::Lt, json!(100000));

        assert_eq!(gt.evaluate(&tx(json!({"amount": 250000.0}))), Ok(true));
        assert_eq!(gt.evaluate(&tx(json!({"amount": 100000}))), Ok(false));
        assert_eq!(lt.evaluate(&tx(json!({"amount": 15000}))), Ok(true));
        assert_eq!(lt.evaluate(&tx(json!({"amount": 100000}))), Ok(false));
    }

    #[test]
    fn test_in() {
        let node = cond("currency", Operator::In, json!(["EUR", "CHF"]));
        assert_eq!(node.evaluate(&tx(json!({"currency": "CHF"}))), Ok(true));
        assert_eq!(node.evaluate(&tx(json!({"currency": "USD"}))), Ok(false));
    }

    #[test]
    fn test_type_mismatch() {
        let node = cond("amount", Operator::Gt, json!(100000));
        let err = node.evaluate(&tx(json!({"amount": "lots"}))).unwrap_err();

        assert_eq!(err.field, "amount");
        assert_eq!(err.op, Operator::Gt);
        assert_eq!(err.found, "string");
        assert_eq!(err.operand, "number");
    }

    #[test]
    fn test_empty_composites() {
        let all = Node::Composite(Composite::new(Mode::All, vec![]));
        let any = Node::Composite(Composite::new(Mode::Any, vec![]));

        assert_eq!(all.evaluate(&tx(json!({}))), Ok(true));
        assert_eq!(any.evaluate(&tx(json!({}))), Ok(false));
    }

    #[test]
    fn test_all_and_any() {
        let high_eur = Node::Composite(Composite::new(
            Mode::All,
            vec![
                cond("amount", Operator::Gt, json!(100000)),
                cond("currency", Operator::Eq, json!("EUR")),
            ],
        ));

        assert_eq!(high_eur.evaluate(&tx(json!({"amount": 250000, "currency": "EUR"}))), Ok(true));
        assert_eq!(high_eur.evaluate(&tx(json!({"amount": 250000, "currency": "USD"}))), Ok(false));

        let either = Node::Composite(Composite::new(
            Mode::Any,
            vec![
                cond("currency", Operator::Eq, json!("EUR")),
                cond("amount", Operator::Gt, json!(100000)),
            ],
        ));
        assert_eq!(either.evaluate(&tx(json!({"amount": 5, "currency": "EUR"}))), Ok(true));
        assert_eq!(either.evaluate(&tx(json!({"amount": 5, "currency": "USD"}))), Ok(false));
    }

    #[test]
    fn test_short_circuit_skips_later_errors() {
        let node = Node::Composite(Composite::new(
            Mode::All,
            vec![
                cond("currency", Operator::Eq, json!("EUR")),
                cond("amount", Operator::Gt, json!(100000)),
            ],
        ));

        let t = tx(json!({"currency": "USD", "amount": "not a number"}));
        assert_eq!(node.evaluate(&t), Ok(false));

        let t = tx(json!({"currency": "EUR", "amount": "not a number"}));
        assert!(node.evaluate(&t).is_err());
    }

    #[test]
    fn test_always() {
        assert_eq!(Node::Always.evaluate(&tx(json!(null))), Ok(true));
    }

    #[test]
    fn test_depth() {
        let leaf = cond("a", Operator::Eq, json!(1));
        assert_eq!(leaf.depth(), 1);

        let nested = Node::Composite(Composite::new(
            Mode::Any,
            vec![leaf.clone(), Node::Composite(Composite::new(Mode::All, vec![leaf]))],
        ));
        assert_eq!(nested.depth(), 3);
    }
}
