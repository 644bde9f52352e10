use serde::{Deserialize, Serialize};
use std::fmt;

/// Compliance outcome, also used as a rule's action.
///
/// Variants are ordered by severity rank. When several rules match,
/// the most severe action wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Decision {
    /// Transaction may proceed
    Allow = 0,
    /// Transaction proceeds but is marked for review
    Flag = 1,
    /// Transaction is stopped
    Block = 2,
}

impl Decision {
    /// Returns the severity rank (allow=0, flag=1, block=2).
    #[inline]
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    /// Lowercase name as written in policy files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Flag => "flag",
            Decision::Block => "block",
        }
    }

    /// Uppercase code as reported by the enforcement endpoint.
    pub fn code(&self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Flag => "FLAG",
            Decision::Block => "BLOCK",
        }
    }

    /// Parse from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Some(Decision::Allow),
            "flag" => Some(Decision::Flag),
            "block" => Some(Decision::Block),
            _ => None,
        }
    }
}

impl Default for Decision {
    fn default() -> Self {
        Decision::Allow
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
