pub mod config;
pub mod console;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod output;
pub mod pipeline;

pub use error::{BridgeError, Result};
