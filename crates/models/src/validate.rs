//! Column-level validation shared by every taxonomy table.

use crate::errors::ModelError;

pub const MAX_ICON_LEN: usize = 255;
pub const MAX_LANGUAGE_CODE_LEN: usize = 16;
pub const MAX_NAME_LEN: usize = 255;

pub fn validate_icon(icon: &str) -> Result<(), ModelError> {
    if icon.chars().count() > MAX_ICON_LEN {
        return Err(ModelError::Validation(format!("icon longer than {MAX_ICON_LEN} characters")));
    }
    Ok(())
}

/// Language codes are short tags such as `en`, `pt-BR` or `zh_Hant`.
pub fn validate_language_code(code: &str) -> Result<(), ModelError> {
    if code.is_empty() {
        return Err(ModelError::Validation("languageCode required".into()));
    }
    if code.len() > MAX_LANGUAGE_CODE_LEN {
        return Err(ModelError::Validation(format!("languageCode `{code}` too long")));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ModelError::Validation(format!("languageCode `{code}` has invalid characters")));
    }
    Ok(())
}

pub fn validate_translation_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("translation name required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ModelError::Validation(format!("translation name longer than {MAX_NAME_LEN} characters")));
    }
    Ok(())
}

/// Stored order columns are `INTEGER`; negative values are never written.
pub fn order_from_db(value: i32) -> Result<u32, ModelError> {
    u32::try_from(value).map_err(|_| ModelError::Db(format!("negative order value {value}")))
}

pub fn order_to_db(value: u32) -> Result<i32, ModelError> {
    i32::try_from(value).map_err(|_| ModelError::Validation(format!("order {value} out of range")))
}
