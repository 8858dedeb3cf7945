//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the sheet-music core crates:
//! - Logging and tracing setup
//! - Configuration assembly and capability checks
//! - Event bus for library and import notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
