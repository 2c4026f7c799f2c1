//! # Portier Storage
//!
//! Storage abstraction for remember-me persistent tokens.
//!
//! Provides the [`TokenProvider`] trait, the [`PersistentToken`] record and
//! an in-memory provider. Relational backends live in their own crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod provider;
pub mod token;

pub use error::StorageError;
pub use memory::InMemoryTokenProvider;
pub use provider::TokenProvider;
pub use token::PersistentToken;
