//! # Adamant Utilities
//!
//! Shared utilities for the Adamant workspace, most notably logging
//! infrastructure built on `tracing`. The resolution engine itself only
//! emits events; hosts call [`init_logging`] (or a sibling) once at
//! startup to decide where those events go.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
