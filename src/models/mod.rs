pub mod agent_request;
pub mod envelope;
