//! # ytsort Common Library
//!
//! Shared code for the ytsort playlist organizer:
//! - Error type and result alias
//! - TOML configuration loading and root folder resolution
//! - SQLite schema for the record cache and persisted reconciliation artifacts
//! - Timestamp and duration parsing

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
