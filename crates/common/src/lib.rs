//! Recast Common Utilities
//!
//! Shared infrastructure for all Recast crates:
//! - Error types and result aliases
//! - Assembly configuration and validation
//! - Timecode parsing for user-supplied trim points
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;
pub mod timecode;

pub use config::*;
pub use error::*;
pub use timecode::parse_time;
