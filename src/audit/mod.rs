//! Audit logging system for the payment core
//!
//! Records create and update operations on payment entities with redacted
//! before/after snapshots in an append-only log. Integrity failures and
//! lockout events land here so every prepared-but-unfinished payment
//! attempt stays traceable.

mod entry;
mod logger;

pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
