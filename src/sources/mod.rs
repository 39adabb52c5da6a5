//! Data-source providers for the region market index.
//!
//! The index is sourced preferentially from the relational aggregate and falls
//! back to derivation from the static location collections. Both implement
//! [`crate::resolver::SourceProvider`] so the chain is just an ordered list.

pub mod sql;
pub mod static_sets;

pub use sql::SqlAggregateSource;
pub use static_sets::StaticCollectionsSource;
