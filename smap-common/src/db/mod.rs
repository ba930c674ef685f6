//! Database access for SMAP
//!
//! Schema initialization and shared entity models. Per-entity query
//! functions live in the service crate.

pub mod init;
pub mod models;

pub use init::{create_tables, init_database};
