use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;

/// Dotted path into a transaction, e.g. `originator.kyc`.
///
/// Parsed once when a rule is compiled so evaluation never re-splits strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: SmallVec<[String; 4]>,
}

impl FieldPath {
    /// Parse a dotted path. Returns None for an empty path or an empty segment.
    pub fn parse(path: &str) -> Option<Self> {
        if path.is_empty() {
            return None;
        }

        let segments: SmallVec<[String; 4]> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        Some(FieldPath { segments })
    }

    /// Path segments in walk order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// A transaction submitted for evaluation.
///
/// No schema is enforced: any nested JSON value is accepted and rules
/// address its fields by dotted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(Value);

impl Transaction {
    pub fn new(value: Value) -> Self {
        Transaction(value)
    }

    /// Resolve a field path.
    ///
    /// Returns `None` when the field is absent: a key is missing or an
    /// intermediate value is not a mapping. A present `null` resolves to
    /// `Some(&Value::Null)`.
    pub fn resolve(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = &self.0;
        for segment in path.segments() {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

impl From<Value> for Transaction {
    fn from(value: Value) -> Self {
        Transaction(value)
    }
}
