//! Charter Daemon library
//!
//! This module provides the components behind `charterd`:
//! - Layered configuration (defaults, file, environment)
//! - Genesis loading and engine wiring
//! - The tick loop and shutdown handling

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use server::Daemon;
