use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

impl EnvelopeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeStatus::Success => "success",
            EnvelopeStatus::Error => "error",
        }
    }
}

/// Stable shape every agent reply is mapped onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEnvelope {
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub result: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl CanonicalEnvelope {
    pub fn success(result: Map<String, Value>) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            result,
            message: None,
            metadata: None,
        }
    }

    /// Error envelope with an empty result, as sent back on every failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            result: Map::new(),
            message: Some(message.into()),
            metadata: None,
        }
    }

    pub fn with_status(mut self, status: EnvelopeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<Map<String, Value>>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == EnvelopeStatus::Error
    }
}
