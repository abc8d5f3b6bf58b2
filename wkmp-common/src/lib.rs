//! # WKMP Common Library
//!
//! Shared code for WKMP components including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Durable key-value settings storage
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod settings;
pub mod time;

pub use error::{Error, Result};
