pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
mod metrics;
pub mod normalize;
pub mod query;
pub mod server;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use error::{Error, Result};
