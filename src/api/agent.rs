use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::models::envelope::CanonicalEnvelope;
use crate::services::agent_errors::AgentError;
use crate::services::agent_proxy::{AgentCallInput, AgentProxy, AgentReply};
use crate::services::agent_transport::{AgentEndpoint, HttpAgentEndpoint};

static AGENT_PROXY: Lazy<AgentProxy<HttpAgentEndpoint>> =
    Lazy::new(|| AgentProxy::from_config(Config::get()));

#[derive(Debug, Deserialize)]
struct AgentCallRequest {
    message: Option<String>,
    agent_id: Option<String>,
    user_id: Option<String>,
    session_id: Option<String>,
    assets: Option<Vec<Value>>,
}

impl From<AgentCallRequest> for AgentCallInput {
    fn from(req: AgentCallRequest) -> Self {
        AgentCallInput {
            message: req.message,
            agent_id: req.agent_id,
            user_id: req.user_id,
            session_id: req.session_id,
            assets: req.assets,
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/agent", post(call_agent))
}

async fn call_agent(
    payload: Result<Json<AgentCallRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    relay_payload(&*AGENT_PROXY, payload).await
}

async fn relay_payload<E: AgentEndpoint>(
    proxy: &AgentProxy<E>,
    payload: Result<Json<AgentCallRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let input = match payload {
        Ok(Json(req)) => AgentCallInput::from(req),
        Err(rejection) => {
            return failure_response(AgentError::Validation(format!(
                "invalid request body: {}",
                rejection.body_text()
            )))
        }
    };

    match proxy.relay(input).await {
        Ok(reply) => success_response(reply),
        Err(err) => failure_response(err),
    }
}

fn success_response(reply: AgentReply) -> (StatusCode, Json<Value>) {
    let mut body = json!({
        "success": true,
        "response": reply.envelope,
        "agent_id": reply.agent_id,
        "user_id": reply.user_id,
        "session_id": reply.session_id,
        "timestamp": reply.timestamp,
        "raw_response": reply.raw_response,
    });
    if let Some(attempt) = reply.retry_attempt {
        body["retry_attempt"] = json!(attempt);
    }
    (StatusCode::OK, Json(body))
}

fn failure_response(err: AgentError) -> (StatusCode, Json<Value>) {
    let message = err.to_string();
    let mut body = json!({
        "success": false,
        "response": CanonicalEnvelope::error(message.clone()),
        "error": message,
    });
    if let Some(raw) = err.raw_response() {
        body["raw_response"] = Value::String(raw.to_string());
    }
    if let Some(retries) = err.retries() {
        body["retry_attempts"] = json!(retries);
    }
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body))
}
