//! HTTP transports for the push gateway and the upstream record store.

pub mod airtable;
pub mod push_gateway;

pub use airtable::AirtableClient;
pub use push_gateway::PushGatewayClient;
