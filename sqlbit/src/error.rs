use std::fmt;
use std::sync::PoisonError;
use thiserror::Error;

/// How the backend classified a failed statement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Database busy or locked by another writer, retrying may succeed.
    Busy,
    Constraint,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Busy => f.write_str("busy"),
            FailureKind::Constraint => f.write_str("constraint"),
            FailureKind::Other => f.write_str("error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrmError {

    #[error("field `{field}` of `{type_name}` has no portable SQL mapping for `{rust_type}`")]
    UnsupportedFieldType { type_name: String, field: String, rust_type: &'static str },

    #[error("duplicate field or column name `{name}` in `{type_name}`")]
    DuplicateFieldName { type_name: String, name: String },

    #[error("field `{field}` of `{type_name}` refers to unregistered type `{nested}`")]
    UnregisteredNestedType { type_name: String, field: String, nested: &'static str },

    #[error("invalid descriptor for `{type_name}`: {reason}")]
    InvalidDescriptor { type_name: String, reason: String },

    #[error("type `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("type `{0}` is not registered")]
    UnregisteredType(String),

    #[error("primary key `{column}` of `{table}` is immutable")]
    PrimaryKeyImmutable { table: String, column: String },

    #[error("column `{column}` does not exist in `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("value {value} is out of range for {target}")]
    ValueOutOfRange { value: String, target: &'static str },

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },

    #[error("unexpected NULL for {target}")]
    UnexpectedNull { target: &'static str },

    #[error("column `{column}`: {source}")]
    Column { column: String, source: Box<OrmError> },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("backend execution failed ({kind}): {message}; sql: {sql}")]
    BackendExecutionFailed { sql: String, message: String, kind: FailureKind },

    #[error("cascade stopped at step {step} of {total} on `{table}`: {source}")]
    PartialCascadeFailure { step: usize, total: usize, table: String, source: Box<OrmError> },

    #[error("invalid connection string: {0}")]
    ConnectionString(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("poisoned lock: {0}")]
    Poisoned(String),
}

impl OrmError {
    /// True for contention failures that a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            OrmError::BackendExecutionFailed { kind, .. } => *kind == FailureKind::Busy,
            OrmError::PartialCascadeFailure { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// SQL text of the statement that failed, if the failure came from the backend.
    pub fn failed_sql(&self) -> Option<&str> {
        match self {
            OrmError::BackendExecutionFailed { sql, .. } => Some(sql),
            OrmError::PartialCascadeFailure { source, .. } => source.failed_sql(),
            _ => None,
        }
    }

    pub(crate) fn in_column(self, column: &str) -> OrmError {
        OrmError::Column { column: column.to_string(), source: Box::new(self) }
    }
}

impl From<bincode::Error> for OrmError {
    fn from(e: bincode::Error) -> Self {
        OrmError::Codec(e.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(e: serde_json::Error) -> Self {
        OrmError::Codec(e.to_string())
    }
}

impl<T> From<PoisonError<T>> for OrmError {
    fn from(e: PoisonError<T>) -> Self {
        OrmError::Poisoned(e.to_string())
    }
}
