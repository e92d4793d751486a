use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid month `{0}`, expected MM-YYYY")]
    InvalidMonth(String),
}

/// A single rejected input field. Validation stops at the first failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} format, expected MM-YYYY")]
    Date {
        field: &'static str,
        source: ParseError,
    },
    #[error("{reason}")]
    Field { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Field {
            field,
            reason: reason.into(),
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            ValidationError::Date { field, .. } | ValidationError::Field { field, .. } => *field,
        }
    }
}
