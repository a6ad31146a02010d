use serde::Serialize;

use crate::errors::TaxonomyError;

use super::domain::Translations;

/// Label picked for one locale, with the code it was actually found under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLabel {
    pub language_code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Picks a display label: requested locale, then the default locale,
/// then the lowest language code present.
#[derive(Clone, Debug)]
pub struct TranslationResolver {
    default_locale: String,
}

impl Default for TranslationResolver {
    fn default() -> Self { Self::new("en") }
}

impl TranslationResolver {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self { default_locale: default_locale.into() }
    }

    pub fn default_locale(&self) -> &str { &self.default_locale }

    pub fn resolve(&self, translations: &Translations, locale: &str) -> Result<ResolvedLabel, TaxonomyError> {
        let hit = translations
            .get(locale)
            .map(|t| (locale, t))
            .or_else(|| translations.get(&self.default_locale).map(|t| (self.default_locale.as_str(), t)))
            .or_else(|| translations.iter().next());
        match hit {
            Some((code, t)) => Ok(ResolvedLabel {
                language_code: code.to_string(),
                name: t.name.clone(),
                description: t.description.clone(),
            }),
            None => Err(TaxonomyError::MissingTranslation(format!("no translation available for locale `{locale}`"))),
        }
    }
}
