//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value storage contract the note store persists through.
//! - Isolate SQLite query details from store/scheduler orchestration.
//!
//! # Invariants
//! - Repository APIs return transport errors only; payload validation is
//!   owned by the store.

pub mod kv_repo;
