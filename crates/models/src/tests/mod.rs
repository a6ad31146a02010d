/// Database connection and configuration tests
pub mod db_tests;

/// Column validation helpers
pub mod validation_tests {
    use uuid::Uuid;

    use crate::category::validate_placement_columns;
    use crate::errors::ModelError;
    use crate::validate::*;

    #[test]
    fn placement_columns_accept_the_three_states() {
        let cluster = Some(Uuid::new_v4());
        assert!(validate_placement_columns(None, None, false).is_ok());
        assert!(validate_placement_columns(cluster, Some(0), false).is_ok());
        assert!(validate_placement_columns(cluster, None, true).is_ok());
        assert!(validate_placement_columns(None, None, true).is_ok());
    }

    #[test]
    fn placement_columns_reject_illegal_combinations() {
        let cluster = Some(Uuid::new_v4());
        assert!(matches!(validate_placement_columns(cluster, None, false), Err(ModelError::Validation(_))));
        assert!(matches!(validate_placement_columns(None, Some(1), false), Err(ModelError::Validation(_))));
        assert!(matches!(validate_placement_columns(cluster, Some(-1), false), Err(ModelError::Validation(_))));
        assert!(matches!(validate_placement_columns(cluster, Some(2), true), Err(ModelError::Validation(_))));
    }

    #[test]
    fn language_codes() {
        assert!(validate_language_code("en").is_ok());
        assert!(validate_language_code("pt-BR").is_ok());
        assert!(validate_language_code("zh_Hant").is_ok());
        assert!(validate_language_code("").is_err());
        assert!(validate_language_code("e n").is_err());
        assert!(validate_language_code(&"x".repeat(MAX_LANGUAGE_CODE_LEN + 1)).is_err());
    }

    #[test]
    fn names_and_icons() {
        assert!(validate_translation_name("Frontend").is_ok());
        assert!(validate_translation_name("   ").is_err());
        assert!(validate_icon("").is_ok());
        assert!(validate_icon(&"i".repeat(MAX_ICON_LEN + 1)).is_err());
    }

    #[test]
    fn order_conversions() {
        assert_eq!(order_from_db(3).unwrap(), 3);
        assert!(matches!(order_from_db(-1), Err(ModelError::Db(_))));
        assert_eq!(order_to_db(7).unwrap(), 7);
        assert!(order_to_db(u32::MAX).is_err());
    }
}
