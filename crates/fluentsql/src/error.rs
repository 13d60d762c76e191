//! Error types for fluentsql

use thiserror::Error;

/// Result type alias for fluentsql operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Builder state rejected before execution
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity metadata cannot support the requested statement
    #[error("Configuration error: {0}")]
    Config(String),

    /// The expression translator cannot render the given predicate or projection
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// SQL references a `@name` placeholder with no bound value
    #[error("Missing parameter: @{0}")]
    MissingParameter(String),

    /// A parameter key was bound twice
    #[error("Duplicate parameter: @{0}")]
    DuplicateParameter(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an unsupported-expression error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedExpression(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Copy of an error recorded by a builder, for accessors that only borrow it.
    pub(crate) fn replicate(&self) -> Self {
        match self {
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::UniqueViolation(m) => Self::UniqueViolation(m.clone()),
            Self::ForeignKeyViolation(m) => Self::ForeignKeyViolation(m.clone()),
            Self::CheckViolation(m) => Self::CheckViolation(m.clone()),
            Self::Decode { column, message } => Self::decode(column.clone(), message.clone()),
            Self::Validation(m) => Self::Validation(m.clone()),
            Self::Config(m) => Self::Config(m.clone()),
            Self::UnsupportedExpression(m) => Self::UnsupportedExpression(m.clone()),
            Self::MissingParameter(m) => Self::MissingParameter(m.clone()),
            Self::DuplicateParameter(m) => Self::DuplicateParameter(m.clone()),
            Self::Timeout(d) => Self::Timeout(*d),
            Self::Query(e) => Self::Other(e.to_string()),
            Self::Other(m) => Self::Other(m.clone()),
        }
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_message_names_the_problem() {
        let err = OrmError::config("no primary key found for table `users`");
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "Configuration error: no primary key found for table `users`"
        );
    }

    #[test]
    fn missing_parameter_renders_with_sigil() {
        let err = OrmError::MissingParameter("age0".to_string());
        assert_eq!(err.to_string(), "Missing parameter: @age0");
    }
}
