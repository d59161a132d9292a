//! kindred Storage - capability traits, store adapters, and the loader
//!
//! This crate defines the `{Reader, Writer}` capability set that every
//! store adapter satisfies, two concrete adapters (a document store for
//! user and credential records, a key-value store for friend adjacency
//! records), and the request-scoped batching [`Loader`] that the query
//! executor uses to reach them.

pub mod document;
pub mod kv;
pub mod loader;
pub mod traits;

pub use document::{DocumentCollection, DocumentStore};
pub use kv::{KvNamespace, KvStore};
pub use loader::{LoadResult, Loader, LoaderConfig};
pub use traits::{BatchFetch, Reader, Writer};
