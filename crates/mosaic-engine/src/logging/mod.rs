//! Logging setup.
//!
//! Everything in the crate logs through the `log` facade. Binaries and tests
//! that want output call [`init_logging`] once at startup.

mod init;

pub use init::{init_logging, LoggingConfig};
