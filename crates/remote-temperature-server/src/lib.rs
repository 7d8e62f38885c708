//! Remote Temperature Server
//!
//! Receives `record_temperature` calls over JSON-RPC and appends them to an
//! SQLite table.

pub mod config;
pub mod recorder;
pub mod rpc;
pub mod storage;

pub use config::Config;
pub use recorder::Recorder;
pub use storage::{Storage, StorageError};
