//! Logging utilities.
//!
//! Logger initialization plus the single exit path used for unrecoverable
//! engine failures. Everything else logs through the `log` facade.

mod fatal;
mod init;

pub use fatal::{fatal, EXIT_ENOMEM, EXIT_MISSING_ENTRY_POINTS};
pub use init::{init_logging, LoggingConfig};
