//! # TubeWatch Common Library
//!
//! Shared code for TubeWatch services including:
//! - Database initialization, schema and models
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod db;
pub mod error;

pub use config::ValidationConfig;
pub use error::{Error, Result};
