//! Taxonomy module: domain types, the ordering and translation engines, the
//! store abstraction with its backends, and the services built on them.

pub mod bulk_sync;
pub mod domain;
pub mod lifecycle;
pub mod ordering;
pub mod query;
pub mod repo;
pub mod repository;
pub mod service;
pub mod translation;

pub use repository::{ChangeSet, TaxonomyStore};
pub use service::TaxonomyService;
pub use translation::TranslationResolver;
