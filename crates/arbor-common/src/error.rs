//! Error types for Arbor.

use thiserror::Error;

/// Result type alias using ArborError.
pub type Result<T> = std::result::Result<T, ArborError>;

/// Errors that can occur in Arbor operations.
///
/// Expected outcomes of tree operations (a duplicate key on insert, a
/// missing key on lookup) are reported here; structural inconsistencies
/// detected mid-mutation are programming defects and panic instead.
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("Invalid tree order: {order} (minimum is 2)")]
    InvalidOrder { order: usize },

    #[error("Duplicate key")]
    DuplicateKey,

    #[error("Key not found")]
    KeyNotFound,

    #[error("Tree corrupted: {0}")]
    TreeCorrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_order_display() {
        let err = ArborError::InvalidOrder { order: 1 };
        assert_eq!(err.to_string(), "Invalid tree order: 1 (minimum is 2)");
    }

    #[test]
    fn test_duplicate_key_display() {
        assert_eq!(ArborError::DuplicateKey.to_string(), "Duplicate key");
    }

    #[test]
    fn test_key_not_found_display() {
        assert_eq!(ArborError::KeyNotFound.to_string(), "Key not found");
    }

    #[test]
    fn test_tree_corrupted_display() {
        let err = ArborError::TreeCorrupted("leaf depth mismatch".to_string());
        assert_eq!(err.to_string(), "Tree corrupted: leaf depth mismatch");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(ArborError::KeyNotFound)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArborError>();
    }
}
