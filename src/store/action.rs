//! Store Actions
//!
//! Actions are dynamically typed: a kind string routes them through
//! reducers, a JSON payload carries the data. Reducers decide relevance by
//! matching on the kind and passing everything else through.

/// Dispatched state-change request
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: String,
    payload: serde_json::Value,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Payload field accessor for object payloads
    pub fn payload_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}
