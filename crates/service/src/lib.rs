//! Service layer for the Clusters → Categories → Services taxonomy.
//! - Keeps ordering, reconciliation and lifecycle rules independent of HTTP.
//! - Reuses column validation and entity definitions from the `models` crate.
//! - Every mutation is computed in memory and committed as one versioned change set.

pub mod errors;
pub mod taxonomy;
#[cfg(test)]
pub mod test_support;
