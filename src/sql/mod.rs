//! SQL generation and execution.

pub mod clickhouse;
pub mod connection;
pub mod dialect;
pub mod errors;
pub mod scripted;
pub mod select_builder;

pub use connection::{
    ConnectedDb, ConnectionFactory, DatabaseOptions, ResultRow, RowCursor, SqlConnection, SqlQuery,
};
pub use dialect::{ColumnType, ColumnTypes, SqlDialect};
pub use errors::ExecutionError;
pub use scripted::{ScriptedConnector, ScriptedRow};
pub use select_builder::SelectStatementBuilder;
