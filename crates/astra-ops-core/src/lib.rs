//! Core types for the Astra database operations client.
//!
//! This crate provides the types shared by every layer of astra-ops:
//!
//! - **Identifiers**: [`DatabaseId`], an opaque id safe to use as a URL path segment
//! - **Status**: [`DatabaseStatus`], the closed set of lifecycle statuses
//! - **DTOs**: [`Database`], [`CreateDatabase`], [`ErrorResponse`]
//! - **Error formatting**: [`format_errors`]
//!
//! # Example
//!
//! ```
//! use astra_ops_core::{format_errors, ApiError, DatabaseId, DatabaseStatus};
//!
//! let id: DatabaseId = "db-123".parse().unwrap();
//! assert_eq!(id.as_str(), "db-123");
//!
//! assert!(DatabaseStatus::Terminating.is_deleted());
//!
//! let errors = [ApiError::new(1, "a"), ApiError::new(2, "b")];
//! assert_eq!(format_errors(&errors), "ID: 1 Text: 'a', ID: 2 Text: 'b'");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;
pub mod status;
pub mod types;

pub use ids::{DatabaseId, IdError};
pub use status::{DatabaseStatus, ParseStatusError};
pub use types::{
    format_errors, ApiError, CreateDatabase, Database, DatabaseInfo, ErrorResponse, Storage,
};
