//! apireg - API contract registry with OpenAPI synchronization
//!
//! This crate provides the core functionality for the `apireg` CLI tool:
//! a registry of API contracts whose endpoints can be kept in step with
//! the OpenAPI documents the APIs publish.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (ApiContract, Endpoint, ChangelogEntry, SyncRun)
//! - [`storage`] - SQLite database layer
//! - [`sync`] - OpenAPI fetch, diff, breaking-change classification and import
//! - [`config`] - Configuration management
//! - [`validate`] - CLI argument normalization
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
