//! Domain model for the five-level taxonomy and its tasks.
//!
//! # Responsibility
//! - Define the canonical records for Universe/Phylum/Family/Group/Task.
//! - Own the base-code derivation rule and its format check.
//!
//! # Invariants
//! - Taxonomy level codes are single characters.
//! - A task's `base_code` is derived from its taxonomy position and is
//!   unique across the system.

pub mod snapshot;
pub mod task;
pub mod taxonomy;
