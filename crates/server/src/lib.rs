pub mod config;
pub mod error;
pub mod kapacitor;
pub mod rest;
pub mod rules;
pub mod scope;
pub mod store;

/// Prefix every API route and hypermedia link is served under.
pub const API_PREFIX: &str = "/chronograf/v1";
