use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::validation::{missing_fields, normalize_non_empty};
use crate::models::agent_request::OutboundRequest;
use crate::models::envelope::CanonicalEnvelope;
use crate::services::agent_errors::AgentError;
use crate::services::agent_transport::{
    AgentEndpoint, AgentTransport, HttpAgentEndpoint, RetryPolicy, TransportOutcome,
};
use crate::services::json_extract::extract_json;
use crate::services::response_normalizer::{detect_shape, normalize};
use crate::utils::log_helpers::{log_agent_begin, log_agent_failure, log_agent_rejected};

const MISSING_CREDENTIAL_MESSAGE: &str = "AGENT_API_KEY not configured on server";

/// Fields accepted from the presentation layer. Blank strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct AgentCallInput {
    pub message: Option<String>,
    pub agent_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub assets: Option<Vec<Value>>,
}

#[cfg(test)]
impl AgentCallInput {
    pub fn new(message: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentReply {
    pub envelope: CanonicalEnvelope,
    pub agent_id: String,
    pub user_id: String,
    pub session_id: String,
    pub timestamp: String,
    pub raw_response: String,
    /// Retries consumed, present only when at least one was needed.
    pub retry_attempt: Option<u32>,
}

pub struct AgentProxy<E> {
    transport: AgentTransport<E>,
    has_credential: bool,
}

impl AgentProxy<HttpAgentEndpoint> {
    pub fn from_config(cfg: &Config) -> Self {
        let endpoint = HttpAgentEndpoint::new(cfg.agent_api_url.clone(), cfg.agent_api_key.clone());
        Self::new(
            AgentTransport::new(endpoint, RetryPolicy::from_config(cfg)),
            cfg.has_agent_api_key(),
        )
    }
}

impl<E: AgentEndpoint> AgentProxy<E> {
    pub fn new(transport: AgentTransport<E>, has_credential: bool) -> Self {
        Self {
            transport,
            has_credential,
        }
    }

    /// Validates input, relays it to the agent service and maps whatever comes
    /// back onto either a reply or one [`AgentError`] variant.
    pub async fn relay(&self, input: AgentCallInput) -> Result<AgentReply, AgentError> {
        let request = match self.build_request(input) {
            Ok(request) => request,
            Err(err) => {
                report_error(&err);
                return Err(err);
            }
        };

        log_agent_begin(
            request.agent_id(),
            request.session_id(),
            &self.transport.endpoint().describe(),
            request.message().chars().count(),
            request.assets().len(),
        );

        let outcome = match self.transport.send(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log_agent_failure(&err.to_string(), None);
                return Err(AgentError::Transport(err.message));
            }
        };

        let result = self.interpret(&request, outcome);
        if let Err(err) = result.as_ref() {
            report_error(err);
        }
        result
    }

    fn build_request(&self, input: AgentCallInput) -> Result<OutboundRequest, AgentError> {
        let message = input.message.filter(|text| !text.trim().is_empty());
        let agent_id = normalize_non_empty(input.agent_id);

        let missing = missing_fields(&[("message", &message), ("agent_id", &agent_id)]);
        let (Some(message), Some(agent_id)) = (message, agent_id) else {
            return Err(AgentError::Validation(format!(
                "{} required",
                missing.join(" and ")
            )));
        };

        if !self.has_credential {
            return Err(AgentError::Configuration(
                MISSING_CREDENTIAL_MESSAGE.to_string(),
            ));
        }

        Ok(OutboundRequest::new(
            message,
            agent_id,
            normalize_non_empty(input.user_id),
            normalize_non_empty(input.session_id),
            input.assets,
        ))
    }

    fn interpret(
        &self,
        request: &OutboundRequest,
        outcome: TransportOutcome,
    ) -> Result<AgentReply, AgentError> {
        let retries = self.transport.policy().max_retries;

        if outcome.is_rate_limited() {
            return Err(AgentError::RateLimitExhausted {
                raw_response: outcome.raw_body,
                retries,
            });
        }

        if !outcome.is_success() {
            let message = upstream_error_message(&extract_json(&outcome.raw_body))
                .unwrap_or_else(|| format!("API returned status {}", outcome.http_status));
            return Err(AgentError::UpstreamHttp {
                status: outcome.http_status,
                message,
                raw_response: outcome.raw_body,
                retries,
            });
        }

        let parsed = extract_json(&outcome.raw_body);
        if let Some(message) = declared_failure(&parsed) {
            return Err(AgentError::UpstreamApplication {
                message,
                raw_response: outcome.raw_body,
            });
        }

        debug!("[AGENT] reply shape: {}", detect_shape(&parsed));
        let envelope = normalize(&parsed);
        if envelope.is_error() {
            warn!(
                "[AGENT] agent reported error status: {}",
                envelope.message.as_deref().unwrap_or("-")
            );
        }
        info!(
            "[AGENT] done: agent={}, session={}, status={}, retries={}",
            request.agent_id(),
            request.session_id(),
            envelope.status.as_str(),
            outcome.attempts_used
        );

        Ok(AgentReply {
            envelope,
            agent_id: request.agent_id().to_string(),
            user_id: request.user_id().to_string(),
            session_id: request.session_id().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            raw_response: outcome.raw_body,
            retry_attempt: Some(outcome.attempts_used).filter(|n| *n > 0),
        })
    }
}

fn report_error(err: &AgentError) {
    let summary = format!("{} ({})", err, err.kind());
    if err.is_client_error() {
        log_agent_rejected(&summary);
    } else {
        log_agent_failure(&summary, err.raw_response());
    }
}

/// `{success: false, error: ...}` replies sent with a 2xx status.
fn declared_failure(parsed: &Value) -> Option<String> {
    if parsed.get("success").and_then(Value::as_bool) != Some(false) {
        return None;
    }
    non_empty_text(parsed.get("error")?)
}

/// `error`, then `message`, from a non-2xx body.
fn upstream_error_message(parsed: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|key| parsed.get(*key))
        .find_map(non_empty_text)
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
