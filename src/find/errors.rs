//! # Graph Errors
//!
//! What a lookup against a [`crate::find::MappedGraph`] can fail with.

use thiserror::Error;

use crate::algebra::errors::CompileError;
use crate::sql::errors::ExecutionError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Graph is closed")]
    Closed,
}

impl GraphError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GraphError::Execution(e) if e.is_timeout())
    }
}
