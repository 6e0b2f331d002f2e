//! Utilities module for error handling and logging
//!
//! This module provides:
//! - The crate error type and `Result` alias
//! - Structured logging setup with tracing

pub mod error;
pub mod logging;

pub use error::{FrameError, Result, ResultExt};
pub use logging::{init_env_logging, init_logging, LogConfig, LogLevel};
