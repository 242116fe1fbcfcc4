//! # Transcriptions Sync Common Library
//!
//! Shared code for the transcriptions sync services:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - Database initialization (content entities, attached fields, tag vocabulary)
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
