use crate::error::{FailureKind, OrmError};
use crate::value::Value;
use std::fmt;

/// Failure reported by a driver, classified so contention can be told apart from data errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverError {
    pub kind: FailureKind,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        DriverError { kind, message: message.into() }
    }

    pub fn into_orm(self, sql: &str) -> OrmError {
        OrmError::BackendExecutionFailed { sql: sql.to_string(), message: self.message, kind: self.kind }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl std::error::Error for DriverError {}

/// The narrow surface a session needs from a database connection.
/// Parameters are named `:column` pairs.
pub trait Connection {
    /// Runs a statement that returns no rows, yielding the number of rows changed.
    fn execute(&mut self, sql: &str, params: &[(String, Value)]) -> Result<usize, DriverError>;

    /// Runs a query and returns every record as values in result column order.
    fn query(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Vec<Vec<Value>>, DriverError>;

    fn begin(&mut self) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;

    fn rollback(&mut self) -> Result<(), DriverError>;
}
