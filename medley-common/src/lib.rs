//! # Medley Common Library
//!
//! Shared code for the medley import crates including:
//! - Error types
//! - Import event types and the EventBus
//! - Configuration loading
//! - Human-readable elapsed time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
