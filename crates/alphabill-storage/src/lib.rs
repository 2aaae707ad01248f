//! SQLite storage for the Alphabill wallet
//!
//! Persists the encrypted vault, the account public keys and small UI state
//! records in a key/value table. Key names are stable across releases.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repository;

pub use database::Database;
pub use error::{Error, Result};
pub use models::ActiveAsset;
pub use repository::Repository;
