//! SeaORM entities for the taxonomy tables plus connection helpers.

pub mod errors;
pub mod db;
pub mod cluster;
pub mod cluster_translation;
pub mod category;
pub mod category_translation;
pub mod service;
pub mod service_translation;
pub mod scope_version;
pub mod validate;

#[cfg(test)]
mod tests;
