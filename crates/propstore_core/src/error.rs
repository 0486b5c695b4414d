//! Error types for the property store.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in property store operations.
///
/// `TypeMismatch` and `NotFound` are expected, recoverable conditions; callers
/// usually fall back to the key's default. `InvalidState` signals misuse of a
/// transaction handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A value was written under a key declaring a different type.
    #[error("type mismatch for {property}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Display form of the property.
        property: String,
        /// Declared type of the property.
        expected: &'static str,
        /// Runtime type of the rejected value.
        actual: &'static str,
    },

    /// The property is absent and declares no default.
    #[error("property not found: {property}")]
    NotFound {
        /// Display form of the property.
        property: String,
    },

    /// Operation not permitted in the transaction's current state.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(
        property: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            property: property.into(),
            expected,
            actual,
        }
    }

    /// Creates a not found error.
    pub fn not_found(property: impl Into<String>) -> Self {
        Self::NotFound {
            property: property.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Returns true for [`CoreError::TypeMismatch`].
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Returns true for [`CoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for [`CoreError::InvalidState`].
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}
