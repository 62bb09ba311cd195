pub mod aggregator;
pub mod amount;
pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod rpc;

pub use config::Config;
pub use error::ChainQueryError;
pub use models::{Severity, Status};
pub use pipeline::BridgeHealthPipeline;
