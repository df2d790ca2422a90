//! Storage layer for tokengate.
//!
//! This crate provides the [`StorageBackend`] key-value abstraction, an
//! in-memory backend with TTL support, and the [`UserStore`](users::UserStore)
//! interface through which the authentication layer reads and writes user
//! accounts.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ tokengate-authn                              │
//! │  SessionService  StorageRevocationStore      │
//! ├──────────────────────────────────────────────┤
//! │ users::BackendUserStore                      │
//! ├──────────────────────────────────────────────┤
//! │ StorageBackend (get, set, set_with_ttl, cas) │
//! ├──────────────────────────────────────────────┤
//! │ MemoryBackend                                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use tokengate_storage::{MemoryBackend, users::{MemoryUserStore, NewUser, UserStore}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let users = MemoryUserStore::new(MemoryBackend::new());
//!
//!     let created = users
//!         .create_user(
//!             NewUser::builder()
//!                 .name("Ada")
//!                 .email("ada@example.com")
//!                 .password_hash(String::from("$argon2id$..."))
//!                 .build(),
//!         )
//!         .await?;
//!
//!     let found = users.find_by_email("ADA@example.com").await?;
//!     assert_eq!(found.map(|u| u.id), Some(created.id));
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with always-failing backend and user store
//!   doubles plus record builders for tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;
pub mod users;

pub use backend::StorageBackend;
pub use error::{BoxError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use types::UserId;
pub use zeroize::Zeroizing;
