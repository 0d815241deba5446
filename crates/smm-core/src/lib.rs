//! Core domain + application logic for the SMM Telegram bot.
//!
//! This crate is intentionally framework-agnostic. Telegram / OpenRouter / SQLite
//! live behind ports (traits) implemented in adapter crates.

pub mod completion;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error_sink;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
