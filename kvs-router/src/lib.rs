//! The shard table and peer list: `MetaStore` is the owned, mutex-guarded
//! source of truth; [`http::router`] exposes it over HTTP.

pub mod error;
pub mod http;
pub mod metastore;
pub mod types;

pub use error::{RouterError, RouterResult};
pub use metastore::MetaStore;
pub use types::{Peer, Shard};
