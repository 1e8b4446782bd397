//! Durable, crash-safe multi-version key/value storage with tx-scoped
//! commit/abort (the `VersionedStore` component). Keys and values are
//! arbitrary byte strings; versions are ordered by a caller-supplied
//! [`kvs_hlc::Timestamp`].
//!
//! Layering: [`storage::engine::Engine`] is a raw, single-threaded byte-string
//! store (a Bitcask-style append-only log, [`storage::log_cask::LogCask`], or
//! an in-memory [`storage::memory::Memory`] for tests). [`key::Key`] encodes
//! the versioned and transaction-indexing namespaces on top of that raw
//! keyspace. [`version_store::VersionedStore`] is the public contract callers
//! use.

pub mod error;
pub mod key;
pub mod keycode;
pub mod storage;
pub mod version_store;

pub use error::{CResult, Error};
pub use version_store::{Tx, VersionedStore};
