//! Core infrastructure for the cellemu crates
//!
//! Holds the configuration model, the shared error taxonomy and the
//! logging setup used by the memory, PPU and kernel crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{CoreError, Result};
