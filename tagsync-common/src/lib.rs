//! # Tagsync Common Library
//!
//! Shared code for the tagsync tools including:
//! - Entity models (items, tags, tag groups, topics, associations)
//! - Error types
//! - Configuration loading

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
