//! Core types and trait definitions for the MCPedia knowledge store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The storage backend and the protocol server both depend on it.

// We intentionally use native `async fn` in traits.
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{
  CONTENT_MAX_BYTES, CONTEXT_LIMIT_DEFAULT, Entry, EntryFilter, EntryKind,
  EntryPatch, EntryStats, LIMIT_MAX, NewEntry, SEARCH_LIMIT_DEFAULT, TagCount,
  clamp_limit, normalize_tags,
};
pub use error::{Error, Result};
pub use store::KnowledgeStore;
