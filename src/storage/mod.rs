//! SQLite storage layer for the registry.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode so readers never wait on an import
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod schema;
pub mod sqlite;

pub use sqlite::{ContractFilter, MutationContext, SqliteStorage};
