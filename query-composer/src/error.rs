//! Composition, normalization and coercion errors.
use displaydoc::Display;
use thiserror::Error;

use crate::coerce::ScalarKind;

/// Errors raised while assembling a selection tree.
///
/// Every variant is surfaced synchronously by the call that violated an invariant; the node the
/// call was made on is left exactly as it was before the call.
#[derive(Error, Display, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ComposeError {
    /// pagination bound {value} is outside the range [{min}, {max}]
    PaginationOutOfRange {
        /// The rejected bound.
        value: i64,
        /// Smallest accepted bound.
        min: u8,
        /// Largest accepted bound.
        max: u8,
    },

    /// relation '{relation}' is already selected {conflict}
    DuplicateSelection {
        /// The relation that was selected twice.
        relation: String,
        /// What the relation was already selected as.
        conflict: SelectionConflict,
    },

    /// field '{token}' is not part of the '{entity}' vocabulary
    UnknownFieldToken {
        /// The entity whose vocabulary was consulted.
        entity: String,
        /// The rejected field token.
        token: String,
    },

    /// '{0}' is not a valid GraphQL name
    InvalidName(String),

    /// argument '{0}' is already set or reserved
    DuplicateArgument(String),

    /// cast of relation '{relation}' on '{type_condition}' cannot carry arguments
    ArgumentsOnCast {
        /// The relation the cast was registered under.
        relation: String,
        /// The concrete type the cast selects.
        type_condition: String,
    },

    /// selection '{path}' does not request any field
    EmptySelection {
        /// Dotted path from the root to the incomplete selection.
        path: String,
    },

    /// selection nesting exceeds the limit of {limit} levels
    RecursionLimitExceeded {
        /// Deepest nesting the build accepted.
        limit: usize,
    },

    /// {0}
    Coercion(#[from] CoercionError),

    /// {0}
    Normalize(#[from] NormalizeError),
}

impl ComposeError {
    /// Stable code the presentation layer can match on.
    pub const fn extension_code(&self) -> &'static str {
        match self {
            ComposeError::PaginationOutOfRange { .. } => "RANGE_ERROR",
            ComposeError::DuplicateSelection { .. } => "DUPLICATE_SELECTION",
            ComposeError::UnknownFieldToken { .. } => "UNKNOWN_FIELD_TOKEN",
            ComposeError::InvalidName(_) => "INVALID_NAME",
            ComposeError::DuplicateArgument(_) => "DUPLICATE_ARGUMENT",
            ComposeError::ArgumentsOnCast { .. } => "ARGUMENTS_ON_CAST",
            ComposeError::EmptySelection { .. } => "EMPTY_SELECTION",
            ComposeError::RecursionLimitExceeded { .. } => "RECURSION_LIMIT_EXCEEDED",
            ComposeError::Coercion(error) => error.extension_code(),
            ComposeError::Normalize(error) => error.extension_code(),
        }
    }
}

/// The existing selection a relation collided with.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum SelectionConflict {
    /// as a plain child
    PlainChild,
    /// with polymorphic casts
    PolymorphicCasts,
    /// with a cast on '{0}'
    TypeCondition(String),
}

/// A normalized value cannot be represented as the requested scalar kind.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoercionError {
    /// cannot coerce {found} into {expected}
    TypeMismatch {
        /// The requested kind.
        expected: ScalarKind,
        /// What the value actually was.
        found: &'static str,
    },

    /// value {value} does not fit into {target}
    Overflow {
        /// The value, as text.
        value: String,
        /// The requested kind.
        target: ScalarKind,
    },

    /// value {value} cannot be represented as {target} without losing precision
    PrecisionLoss {
        /// The value, as text.
        value: String,
        /// The requested kind.
        target: ScalarKind,
    },

    /// '{value}' is not a valid {target} literal
    InvalidFormat {
        /// The rejected literal.
        value: String,
        /// The requested kind.
        target: ScalarKind,
    },

    /// non-finite number cannot be coerced into {0}
    NonFinite(ScalarKind),

    /// expected a scalar, found {0}
    NotAScalar(&'static str),
}

impl CoercionError {
    pub const fn extension_code(&self) -> &'static str {
        "COERCION_ERROR"
    }
}

/// A host value could not be normalized into a canonical value.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    /// value nesting exceeds the limit of {limit} levels, the input may be cyclic
    RecursionLimitExceeded {
        /// Deepest nesting the normalizer accepted.
        limit: usize,
    },

    /// mapping keys must have a display form, found {0}
    InvalidKey(&'static str),

    /// integer {0} is outside the supported range
    IntegerOutOfRange(String),

    /// malformed {kind} value '{value}'
    InvalidScalar {
        /// The scalar the marker announced.
        kind: &'static str,
        /// The payload that failed to parse.
        value: String,
    },

    /// {0}
    Custom(String),
}

impl NormalizeError {
    pub const fn extension_code(&self) -> &'static str {
        match self {
            NormalizeError::RecursionLimitExceeded { .. } => "RECURSION_LIMIT_EXCEEDED",
            _ => "NORMALIZATION_ERROR",
        }
    }
}

impl serde::ser::Error for NormalizeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        NormalizeError::Custom(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_come_from_doc_comments() {
        let error = ComposeError::PaginationOutOfRange {
            value: 101,
            min: 1,
            max: 100,
        };
        assert_eq!(
            error.to_string(),
            "pagination bound 101 is outside the range [1, 100]"
        );

        let error = ComposeError::DuplicateSelection {
            relation: "record".to_string(),
            conflict: SelectionConflict::TypeCondition("TypeA".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "relation 'record' is already selected with a cast on 'TypeA'"
        );
    }

    #[test]
    fn nested_errors_keep_their_code() {
        let error = ComposeError::from(CoercionError::Overflow {
            value: "300".to_string(),
            target: ScalarKind::UInt8,
        });
        assert_eq!(error.extension_code(), "COERCION_ERROR");
        assert_eq!(error.to_string(), "value 300 does not fit into UInt8");

        let error = ComposeError::from(NormalizeError::RecursionLimitExceeded { limit: 4 });
        assert_eq!(error.extension_code(), "RECURSION_LIMIT_EXCEEDED");
    }
}
