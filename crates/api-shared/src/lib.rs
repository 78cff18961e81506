//! # API Shared
//!
//! Shared utilities and definitions for the lab HTTP servers.
//!
//! Contains:
//! - `HealthService` and its `HealthRes` body
//! - `ApiError`, mapping lab errors to HTTP statuses
//! - `JsonBody`, a lenient JSON body extractor into typed request structs
//!
//! Used by `api-rest` and the workspace binary.

pub mod error;
pub mod health;
pub mod json;

pub use error::ApiError;
pub use health::{HealthRes, HealthService};
pub use json::{non_blank, JsonBody};
