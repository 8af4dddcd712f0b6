pub mod agent_errors;
pub mod agent_proxy;
pub mod agent_transport;
pub mod json_extract;
pub mod response_normalizer;
