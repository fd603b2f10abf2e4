pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod event_cache;
pub mod export;
pub mod gateway;
pub mod identifier;
pub mod keywords;
pub mod reviews;
pub mod share_table;

pub use discovery::{discover_competitors, DiscoveryResult, DiscoverySettings};
pub use error::GatewayError;
pub use share_table::{extract_share_table, ShareRecord};
