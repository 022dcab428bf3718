//! In-memory cache store for computed read models.
//!
//! Uses `moka` for bounded, per-entry TTL caching. The store is only an
//! accelerator: every payload can be recomputed from the database.

pub mod moka_store;

pub use moka_store::MokaCacheStore;
