//! Host-facing bindings for RemindNote.
//!
//! The host UI renders notes and owns the real alert channel; it calls into
//! this crate for every store mutation and for each reminder check.

pub mod api;
