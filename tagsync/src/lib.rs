//! tagsync library interface
//!
//! Exposes the database layer, tagging server client, and batch services
//! for integration testing and for the `tagsync` binary.

pub mod cli;
pub mod db;
pub mod services;

pub use tagsync_common::{Error, Result};
