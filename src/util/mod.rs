//! Internal utilities for the regent runtime.
//!
//! These utilities are intentionally minimal and dependency-free so the
//! scheduler's behavior stays deterministic and auditable.

pub mod arena;

pub use arena::{Arena, ArenaIndex};
