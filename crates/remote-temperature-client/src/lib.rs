//! Remote Temperature Client
//!
//! Periodically reads the one-wire thermometers attached to this device and
//! sends the readings to a remote temperature server.

pub mod config;
pub mod recorder;
pub mod sanity;

pub use config::Config;
pub use recorder::{RecordError, RecorderClient, ShutdownHandle};
pub use sanity::{SanityBounds, SanityError};
