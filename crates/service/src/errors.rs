use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("order conflict: {0}")]
    OrderConflict(String),
    #[error("scope mismatch: {0}")]
    ScopeMismatch(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("missing translation: {0}")]
    MissingTranslation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("store error: {0}")]
    Store(String),
}

impl TaxonomyError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {} not found", entity, id))
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            TaxonomyError::Validation(_) => 2001,
            TaxonomyError::OrderConflict(_) => 2002,
            TaxonomyError::ScopeMismatch(_) => 2003,
            TaxonomyError::NotFound(_) => 2004,
            TaxonomyError::MissingTranslation(_) => 2005,
            TaxonomyError::Unauthorized => 2006,
            TaxonomyError::Store(_) => 2100,
        }
    }
}

impl From<models::errors::ModelError> for TaxonomyError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(msg) => TaxonomyError::Validation(msg),
            models::errors::ModelError::Db(msg) => TaxonomyError::Store(msg),
        }
    }
}

impl From<sea_orm::DbErr> for TaxonomyError {
    fn from(e: sea_orm::DbErr) -> Self { TaxonomyError::Store(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ModelError;

    #[test]
    fn model_errors_map_to_taxonomy_kinds() {
        assert!(matches!(TaxonomyError::from(ModelError::Validation("x".into())), TaxonomyError::Validation(_)));
        assert!(matches!(TaxonomyError::from(ModelError::Db("x".into())), TaxonomyError::Store(_)));
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            TaxonomyError::Validation(String::new()),
            TaxonomyError::OrderConflict(String::new()),
            TaxonomyError::ScopeMismatch(String::new()),
            TaxonomyError::NotFound(String::new()),
            TaxonomyError::MissingTranslation(String::new()),
            TaxonomyError::Unauthorized,
            TaxonomyError::Store(String::new()),
        ];
        let mut codes: Vec<u16> = all.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
