//! # Grafeas Elasticsearch Shared
//!
//! This crate defines the entity types exchanged between the Grafeas storage
//! contract and the Elasticsearch backend. Entities are carried as
//! self-describing JSON: the handful of attributes the backend reads or writes
//! are typed, everything else passes through untouched.

pub mod types;

pub use types::entities::{
    Note, Occurrence, Project, VulnerabilityOccurrencesSummary, NOTES_COLLECTION,
    OCCURRENCES_COLLECTION, PROJECTS_COLLECTION,
};
pub use types::field_mask::FieldMask;
pub use types::page::{BatchCreateResult, Page};
