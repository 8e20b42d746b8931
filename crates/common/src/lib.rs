//! Common utilities and shared types for FixMyCity.
//!
//! This crate provides foundational components used across all FixMyCity crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: Monotonic ULID identifiers via [`IdGenerator`]
//! - **Storage**: Object storage backends (local, S3-compatible) for complaint media
//!
//! # Example
//!
//! ```no_run
//! use fixmycity_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("{} -> {}", config.server.url, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use storage::{LocalStorage, StorageBackend, StorageService, StoredObject};

#[cfg(feature = "s3")]
pub use storage::S3Storage;
