use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A policy document as read from YAML or JSON, before compilation.
///
/// Two layouts are accepted:
///
/// ```yaml
/// # bare list of rule specifications
/// - name: default_allow
///   action: allow
/// ```
///
/// ```yaml
/// # versioned document
/// policy_version: "2025-01-01.1"
/// rules:
///   - name: default_allow
///     action: allow
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument {
    /// Version declared in the document, if any
    pub declared_version: Option<String>,

    /// Hash of the document text, used for change detection
    pub fingerprint: String,

    /// Rule specifications (expected to be a sequence)
    pub rules: Value,
}

impl PolicyDocument {
    /// Build a document from parsed data and the text it came from.
    pub fn from_value(value: Value, source: &str) -> Self {
        let fingerprint = compute_fingerprint(source);

        match value {
            Value::Object(mut map) if map.contains_key("rules") => {
                let declared_version = map.remove("policy_version").and_then(|v| match v {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                });
                let rules = map.remove("rules").unwrap_or(Value::Null);

                PolicyDocument {
                    declared_version,
                    fingerprint,
                    rules,
                }
            }
            rules => PolicyDocument {
                declared_version: None,
                fingerprint,
                rules,
            },
        }
    }

    /// Version reported for this document: the declared one, or one
    /// derived from the content hash.
    pub fn version(&self) -> String {
        match &self.declared_version {
            Some(v) => v.clone(),
            None => format!("auto-{}", self.fingerprint),
        }
    }
}

/// Compute a hash of policy text for change detection.
pub fn compute_fingerprint(source: &str) -> String {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
