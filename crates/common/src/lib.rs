//! Optica Common Utilities
//!
//! Shared infrastructure for all Optica crates:
//! - Error taxonomy and result aliases
//! - Error classification into display-ready events
//! - Tracing/logging initialization
//! - Configuration loading

pub mod classify;
pub mod config;
pub mod error;
pub mod logging;

pub use classify::*;
pub use config::*;
pub use error::*;
