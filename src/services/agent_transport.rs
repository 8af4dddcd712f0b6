use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::agent_request::OutboundRequest;
use crate::utils::log_helpers::{log_agent_retry, truncate_log};

const RATE_LIMITED: u16 = 429;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReply {
    pub status: u16,
    pub body: String,
}

/// One POST to the agent service. `Err` means no response was received.
pub trait AgentEndpoint: Send + Sync {
    fn post<'a>(&'a self, request: &'a OutboundRequest)
        -> BoxFuture<'a, Result<EndpointReply, String>>;

    fn describe(&self) -> String {
        "agent-endpoint".to_string()
    }
}

pub struct HttpAgentEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpAgentEndpoint {
    pub fn new(url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

impl AgentEndpoint for HttpAgentEndpoint {
    fn post<'a>(
        &'a self,
        request: &'a OutboundRequest,
    ) -> BoxFuture<'a, Result<EndpointReply, String>> {
        async move {
            let resp = self
                .client
                .post(&self.url)
                .header("x-api-key", &self.api_key)
                .json(request)
                .send()
                .await
                .map_err(|err| err.to_string())?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(|err| err.to_string())?;
            Ok(EndpointReply { status, body })
        }
        .boxed()
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            jitter_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_retries: cfg.agent_max_retries,
            base_delay_ms: cfg.agent_retry_base_delay_ms,
            max_delay_ms: cfg.agent_retry_max_delay_ms,
            jitter_ms: cfg.agent_retry_jitter_ms,
        }
    }

    /// Delay before retry `attempt` (0 for the first retry):
    /// `min(base * 2^attempt + jitter, max)` with jitter drawn from `[0, jitter_ms)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        };
        self.delay_with_jitter(attempt, jitter)
    }

    fn delay_with_jitter(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let exponential = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(exponential.saturating_add(jitter_ms).min(self.max_delay_ms))
    }
}

/// Terminal reply of a relayed call. `attempts_used` counts the retries
/// consumed, so a first-try answer reports 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOutcome {
    pub http_status: u16,
    pub raw_body: String,
    pub attempts_used: u32,
}

impl TransportOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.http_status == RATE_LIMITED
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub attempts_used: u32,
}

pub struct AgentTransport<E> {
    endpoint: E,
    policy: RetryPolicy,
}

impl<E: AgentEndpoint> AgentTransport<E> {
    pub fn new(endpoint: E, policy: RetryPolicy) -> Self {
        Self { endpoint, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Retries 429 replies and network failures with exponential backoff.
    /// Any other status is returned as soon as it arrives. `Err` only when no
    /// reply was ever received.
    pub async fn send(&self, request: &OutboundRequest) -> Result<TransportOutcome, TransportError> {
        let max_retries = self.policy.max_retries;
        let mut last_reply: Option<EndpointReply> = None;
        let mut attempt: u32 = 0;

        info!(
            "[AGENT] send: endpoint={}, agent={}, session={}",
            self.endpoint.describe(),
            request.agent_id(),
            request.session_id()
        );

        loop {
            match self.endpoint.post(request).await {
                Ok(reply) if reply.status == RATE_LIMITED && attempt < max_retries => {
                    let delay = self.policy.backoff_delay(attempt);
                    log_agent_retry("Rate limited (429)", attempt, max_retries, delay);
                    last_reply = Some(reply);
                    tokio::time::sleep(delay).await;
                }
                Ok(reply) => {
                    if reply.status == RATE_LIMITED {
                        warn!(
                            "[AGENT] rate limit persisted after {} retries: body={}",
                            attempt,
                            truncate_log(&reply.body, 400)
                        );
                    }
                    return Ok(TransportOutcome {
                        http_status: reply.status,
                        raw_body: reply.body,
                        attempts_used: attempt,
                    });
                }
                Err(err) if attempt < max_retries => {
                    let delay = self.policy.backoff_delay(attempt);
                    log_agent_retry(
                        &format!("Network error ({})", err),
                        attempt,
                        max_retries,
                        delay,
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    // A 429 seen earlier still counts as the last response.
                    if let Some(reply) = last_reply {
                        return Ok(TransportOutcome {
                            http_status: reply.status,
                            raw_body: reply.body,
                            attempts_used: attempt,
                        });
                    }
                    return Err(TransportError {
                        message: err,
                        attempts_used: attempt,
                    });
                }
            }
            attempt += 1;
        }
    }
}
