//! JAPEM Core - Shared types library.
//!
//! This crate provides common types used across all JAPEM components:
//! - `api` - REST backend for donations, inventory lots, institutions and deliveries
//! - `cli` - Command-line tools for migrations and user/token management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
