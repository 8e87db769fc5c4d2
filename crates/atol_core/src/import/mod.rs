//! CSV import/export pipeline.
//!
//! # Responsibility
//! - Parse snapshot CSV files into typed rows.
//! - Validate rows against domain rules and cross-row references.
//! - Diff rows against current state and find implied task deletions.
//! - Orchestrate preview/apply with confirmation gating.
//!
//! # Invariants
//! - Import files are complete snapshots: an existing task absent from
//!   the file is a deletion candidate, never silently kept.
//! - Apply is refused while blocking validation errors exist.

pub mod csv;
pub mod diff;
pub mod export;
pub mod service;
pub mod validate;
