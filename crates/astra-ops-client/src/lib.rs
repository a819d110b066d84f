//! Lifecycle client for Astra databases.
//!
//! Mutating operations are not "fire the request" but "fire the request, then
//! wait until the database's observed status converges, or give up".
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AstraClient                          │
//! │   create_db / terminate / park / unpark / wait_until        │
//! └─────────────────────────────────────────────────────────────┘
//!            │ 1. one request                │ 2. poll find_db
//!            ▼                               ▼
//! ┌──────────────────────┐       ┌──────────────────────────────┐
//! │   Action dispatcher  │       │     Convergence poller       │
//! │   expected status    │       │  RetryPolicy × Target        │
//! │   or RemoteRejection │       │  Reached | Gone | Timeout    │
//! └──────────────────────┘       └──────────────────────────────┘
//!            │                               │
//!            └───────────────┬───────────────┘
//!                            ▼
//!                  pooled reqwest::Client
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use astra_ops_client::{AstraClient, ClientConfig, CreateDatabase, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AstraClient::new(ClientConfig::default().verbose(true), "AstraCS:...")?;
//!
//! let request = CreateDatabase::new("orders", "shop", "GCP", "europe-west1", "serverless");
//! let db = client.create_db(&request, RetryPolicy::CREATE).await?;
//! println!("{} is {}", db.id, db.status);
//!
//! client.terminate(&db.id, false, RetryPolicy::TERMINATE).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod poll;

pub use client::AstraClient;
pub use config::ClientConfig;
pub use dispatch::Action;
pub use error::{ClientError, Result};
pub use poll::{poll_until, DatabaseSource, RetryPolicy, Target};

// Re-export commonly used types from the core crate for convenience
pub use astra_ops_core::{
    format_errors, ApiError, CreateDatabase, Database, DatabaseId, DatabaseStatus,
};
