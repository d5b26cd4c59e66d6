//! Core data structures shared by the storage backend and its callers.

pub mod entities;
pub mod field_mask;
pub mod page;
