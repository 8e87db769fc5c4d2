//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the injected data-access contract consumed by import and
//!   task services.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Repository writes enforce model validation before SQL mutations.
//! - Repository APIs return semantic errors (`NotFound`, `Constraint`)
//!   in addition to DB transport errors.

pub mod system_repo;
