//! # Statement Execution Errors
//!
//! Failures raised while talking to a database. Unlike compile errors they
//! happen per lookup, and some of them (a dropped connection) are worth a
//! retry on a fresh connection.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Failed to connect to database `{database}`: {message}")]
    Connect { database: String, message: String },

    #[error("Connection lost: {message}")]
    ConnectionLost { message: String },

    #[error("SQL error: {message}\nStatement: {sql}")]
    Sql { sql: String, message: String },

    #[error("Query timed out after {timeout:?}\nStatement: {sql}")]
    QueryTimeout { sql: String, timeout: Duration },

    #[error("Database connection is closed")]
    Closed,
}

impl ExecutionError {
    /// Only a lost connection is retried; a timeout or a SQL error would
    /// fail again on a fresh connection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecutionError::ConnectionLost { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::QueryTimeout { .. })
    }
}
