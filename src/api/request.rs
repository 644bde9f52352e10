use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::Transaction;

fn default_context() -> Option<String> {
    Some("Standard".to_string())
}

/// Transfer submitted to the enforcement endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforceRequest {
    /// Caller's transaction identifier
    pub id: String,

    /// Originating party (e.g. `{"kyc": true, "id": "BANK_001"}`)
    pub originator: Map<String, Value>,

    /// Receiving party
    #[serde(default)]
    pub beneficiary: Map<String, Value>,

    /// Transfer amount
    pub amount: f64,

    /// ISO currency code
    pub currency: String,

    /// Regulatory context of the transfer
    #[serde(default = "default_context")]
    pub context: Option<String>,
}

impl EnforceRequest {
    /// Convert to a Transaction for rule evaluation.
    pub fn to_transaction(&self) -> Transaction {
        Transaction::new(json!({
            "id": self.id,
            "originator": self.originator,
            "beneficiary": self.beneficiary,
            "amount": self.amount,
            "currency": self.currency,
            "context": self.context,
        }))
    }
}
