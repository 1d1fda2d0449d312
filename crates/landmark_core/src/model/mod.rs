//! Domain model for the landmark registry.
//!
//! # Invariants
//! - Every landmark carries a stable `uuid` from construction.
//! - Retirement is a soft-delete flag; permanent removal is a separate purge.

pub mod landmark;
