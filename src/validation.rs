use crate::error::AppError;

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Catalog keys (blocks, filters) are lowercase snake_case identifiers.
pub fn require_catalog_key(field: &str, value: &str) -> Result<(), AppError> {
    let valid = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && value.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    if !valid {
        return Err(AppError::Validation(format!(
            "{field} '{value}' must be lowercase snake_case (a-z, 0-9, _), max 64 chars"
        )));
    }
    Ok(())
}

pub fn require_weight(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || !(0.0..=2.0).contains(&value) {
        return Err(AppError::Validation(format!("{field} must be between 0.0 and 2.0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_key_rules() {
        assert!(require_catalog_key("key", "lighting_soft").is_ok());
        assert!(require_catalog_key("key", "camera2").is_ok());
        assert!(require_catalog_key("key", "").is_err());
        assert!(require_catalog_key("key", "Lighting").is_err());
        assert!(require_catalog_key("key", "2camera").is_err());
        assert!(require_catalog_key("key", "soft-light").is_err());
    }

    #[test]
    fn test_weight_bounds() {
        assert!(require_weight("weight", 0.8).is_ok());
        assert!(require_weight("weight", 2.0).is_ok());
        assert!(require_weight("weight", -0.1).is_err());
        assert!(require_weight("weight", f64::NAN).is_err());
    }
}
