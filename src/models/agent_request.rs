use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Body posted to the agent service. Built once per call and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundRequest {
    message: String,
    agent_id: String,
    user_id: String,
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets: Option<Vec<Value>>,
}

impl OutboundRequest {
    /// Missing identifiers are generated; an empty asset list is dropped.
    pub fn new(
        message: String,
        agent_id: String,
        user_id: Option<String>,
        session_id: Option<String>,
        assets: Option<Vec<Value>>,
    ) -> Self {
        let user_id = user_id.unwrap_or_else(generate_user_id);
        let session_id = session_id.unwrap_or_else(|| generate_session_id(&agent_id));
        let assets = assets.filter(|items| !items.is_empty());
        Self {
            message,
            agent_id,
            user_id,
            session_id,
            assets,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn assets(&self) -> &[Value] {
        self.assets.as_deref().unwrap_or(&[])
    }
}

pub fn generate_user_id() -> String {
    format!("user-{}", Uuid::new_v4())
}

pub fn generate_session_id(agent_id: &str) -> String {
    let suffix: String = Uuid::new_v4().to_string().chars().take(12).collect();
    format!("{}-{}", agent_id, suffix)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn generates_missing_identifiers() {
        let req = OutboundRequest::new("hi".into(), "agent-1".into(), None, None, None);
        assert!(req.user_id().starts_with("user-"));
        assert_eq!(req.user_id().len(), "user-".len() + 36);
        assert!(req.session_id().starts_with("agent-1-"));
        assert_eq!(req.session_id().len(), "agent-1-".len() + 12);
    }

    #[test]
    fn keeps_caller_identifiers() {
        let req = OutboundRequest::new(
            "hi".into(),
            "agent-1".into(),
            Some("u-1".into()),
            Some("s-1".into()),
            None,
        );
        assert_eq!(req.user_id(), "u-1");
        assert_eq!(req.session_id(), "s-1");
    }

    #[test]
    fn serializes_assets_only_when_present() {
        let req = OutboundRequest::new(
            "hi".into(),
            "a".into(),
            Some("u".into()),
            Some("s".into()),
            Some(Vec::new()),
        );
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"message": "hi", "agent_id": "a", "user_id": "u", "session_id": "s"})
        );

        let req = OutboundRequest::new(
            "hi".into(),
            "a".into(),
            Some("u".into()),
            Some("s".into()),
            Some(vec![json!("asset-1")]),
        );
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["assets"], json!(["asset-1"]));
        assert_eq!(req.assets().len(), 1);
    }

    #[test]
    fn session_ids_differ_between_calls() {
        assert_ne!(generate_session_id("a"), generate_session_id("a"));
    }
}
