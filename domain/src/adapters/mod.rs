//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory database backs unit tests and `STORAGE_PROVIDER=memory`.
//! The SQLite adapter lives in its own crate.

pub mod memory_repo;
