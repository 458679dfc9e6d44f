//! # Mapping Compile Errors
//!
//! Errors raised while compiling property bridges into relations, before any
//! SQL is issued. Every variant names the bridge it was raised for so that the
//! mapping author can locate the offending rule.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("Invalid attribute reference `{reference}`: expected [schema.]table.column")]
    InvalidAttribute { reference: String },

    #[error("Invalid join between {left} and {right}: {detail}")]
    InvalidJoin {
        left: String,
        right: String,
        detail: String,
    },

    #[error("Bridge `{bridge}` can never produce a row (its condition is unsatisfiable)")]
    UnsatisfiableRelation { bridge: String },

    #[error("Bridge `{bridge}` references tables {relations} that are not connected by its joins")]
    DisconnectedJoinGraph { bridge: String, relations: String },

    #[error("Bridge `{bridge}` uses attribute `{attribute}` that is not projected by its relation")]
    MissingProjection { bridge: String, attribute: String },

    #[error("Bridge `{bridge}` refers to unknown database `{database}`")]
    UnknownDatabase { bridge: String, database: String },

    #[error("Cannot combine relations from databases `{left}` and `{right}` into one statement")]
    CrossDatabaseJoin { left: String, right: String },
}

/// Helper methods for creating errors with context information
impl CompileError {
    /// Attach the bridge name to an error raised by a lower layer that did
    /// not know which bridge it was working on.
    pub fn in_bridge(self, bridge: &str) -> Self {
        match self {
            CompileError::UnsatisfiableRelation { .. } => CompileError::UnsatisfiableRelation {
                bridge: bridge.to_string(),
            },
            CompileError::DisconnectedJoinGraph { relations, .. } => {
                CompileError::DisconnectedJoinGraph {
                    bridge: bridge.to_string(),
                    relations,
                }
            }
            CompileError::MissingProjection { attribute, .. } => CompileError::MissingProjection {
                bridge: bridge.to_string(),
                attribute,
            },
            CompileError::UnknownDatabase { database, .. } => CompileError::UnknownDatabase {
                bridge: bridge.to_string(),
                database,
            },
            other => other,
        }
    }
}
