//! Reminder evaluation and delivery.
//!
//! # Responsibility
//! - Periodically find due reminders in the note store (`scheduler`).
//! - Surface each due reminder to the user exactly once (`notifier`).
//!
//! # Invariants
//! - A reminder is recorded as fired even when delivery fails.
//! - Evaluation never blocks on the permission prompt.

pub mod notifier;
pub mod scheduler;
