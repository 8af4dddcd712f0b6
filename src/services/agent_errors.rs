use thiserror::Error;

pub const RATE_LIMIT_EXHAUSTED_MESSAGE: &str =
    "Too many requests. The service is currently busy. Please wait a moment and try again.";

/// Every way a relayed agent call can fail. All variants are recovered at the
/// HTTP boundary and rendered as a `success: false` body.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{}", RATE_LIMIT_EXHAUSTED_MESSAGE)]
    RateLimitExhausted { raw_response: String, retries: u32 },

    #[error("{message}")]
    UpstreamApplication {
        message: String,
        raw_response: String,
    },

    #[error("{message}")]
    UpstreamHttp {
        status: u16,
        message: String,
        raw_response: String,
        retries: u32,
    },

    #[error("{0}")]
    Transport(String),
}

impl AgentError {
    pub fn http_status(&self) -> u16 {
        match self {
            AgentError::Validation(_) => 400,
            AgentError::Configuration(_) => 500,
            AgentError::RateLimitExhausted { .. } => 429,
            AgentError::UpstreamApplication { .. } => 200,
            AgentError::UpstreamHttp { status, .. } => *status,
            AgentError::Transport(_) => 500,
        }
    }

    /// Rejections caused by the caller's own request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AgentError::Validation(_))
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AgentError::RateLimitExhausted { raw_response, .. }
            | AgentError::UpstreamApplication { raw_response, .. }
            | AgentError::UpstreamHttp { raw_response, .. } => Some(raw_response.as_str()),
            AgentError::Validation(_) | AgentError::Configuration(_) | AgentError::Transport(_) => {
                None
            }
        }
    }

    /// Retry budget reported alongside upstream HTTP failures.
    pub fn retries(&self) -> Option<u32> {
        match self {
            AgentError::RateLimitExhausted { retries, .. }
            | AgentError::UpstreamHttp { retries, .. } => Some(*retries),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Validation(_) => "validation",
            AgentError::Configuration(_) => "configuration",
            AgentError::RateLimitExhausted { .. } => "rate_limit_exhausted",
            AgentError::UpstreamApplication { .. } => "upstream_application",
            AgentError::UpstreamHttp { .. } => "upstream_http",
            AgentError::Transport(_) => "transport",
        }
    }
}
