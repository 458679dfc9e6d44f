//! Database access: the connection traits the engine consumes, result rows,
//! and [`ConnectedDb`], which owns one logical connection per database.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::dialect::{ColumnTypes, SqlDialect};
use super::errors::ExecutionError;
use crate::algebra::attribute::Attribute;
use crate::algebra::projection::ProjectionSpec;
use crate::algebra::relation::DatabaseId;
use crate::config::EngineConfig;

/// A statement ready to run, with the projection each result column holds.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    /// The i-th entry describes the i-th column of every row.
    pub columns: Vec<ProjectionSpec>,
    pub fetch_size: Option<usize>,
    pub timeout: Option<Duration>,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>, columns: Vec<ProjectionSpec>) -> Self {
        SqlQuery {
            sql: sql.into(),
            columns,
            fetch_size: None,
            timeout: None,
        }
    }
}

pub type ColumnIndex = Arc<HashMap<ProjectionSpec, usize>>;

pub fn column_index(columns: &[ProjectionSpec]) -> ColumnIndex {
    Arc::new(
        columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect(),
    )
}

/// One result row. Values are positional; the shared index maps each
/// projection to its position.
#[derive(Debug, Clone)]
pub struct ResultRow {
    values: Vec<Option<String>>,
    index: ColumnIndex,
}

impl ResultRow {
    pub fn new(index: ColumnIndex, values: Vec<Option<String>>) -> Self {
        ResultRow { values, index }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (ProjectionSpec, Option<String>)>) -> Self {
        let (columns, values): (Vec<ProjectionSpec>, Vec<Option<String>>) =
            pairs.into_iter().unzip();
        ResultRow {
            values,
            index: column_index(&columns),
        }
    }

    /// `None` for NULL and for projections the row does not carry.
    pub fn get(&self, projection: &ProjectionSpec) -> Option<&str> {
        let i = *self.index.get(projection)?;
        self.values.get(i)?.as_deref()
    }

    pub fn get_attribute(&self, attribute: &Attribute) -> Option<&str> {
        self.get(&ProjectionSpec::Attribute(attribute.clone()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows of an executing statement. Dropping the cursor releases it.
#[cfg_attr(test, mockall::automock)]
pub trait RowCursor: Send {
    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>, ExecutionError>;

    fn close(&mut self);
}

/// A single physical connection. Not safe for concurrent statements.
#[cfg_attr(test, mockall::automock)]
pub trait SqlConnection: Send {
    fn execute(&mut self, query: &SqlQuery) -> Result<Box<dyn RowCursor>, ExecutionError>;

    /// Cheap round trip used to validate an idle connection.
    fn ping(&mut self) -> Result<(), ExecutionError>;

    fn close(&mut self);
}

/// Opens new connections, initially and after a connection was lost.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self) -> Result<Box<dyn SqlConnection>, ExecutionError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseOptions {
    pub fetch_size: Option<usize>,
    /// Upper bound on rows per statement, applied as a LIMIT.
    pub result_size_limit: Option<u64>,
    pub statement_timeout: Option<Duration>,
    /// Connections idle for longer are pinged before reuse.
    pub keep_alive: Option<Duration>,
    pub max_reconnect_attempts: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        DatabaseOptions {
            fetch_size: None,
            result_size_limit: None,
            statement_timeout: None,
            keep_alive: None,
            max_reconnect_attempts: 1,
        }
    }
}

impl DatabaseOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        let positive = |v: u64| (v > 0).then_some(v);
        DatabaseOptions {
            fetch_size: (config.fetch_size > 0).then_some(config.fetch_size),
            result_size_limit: positive(config.result_size_limit),
            statement_timeout: positive(config.statement_timeout_secs).map(Duration::from_secs),
            keep_alive: positive(config.keep_alive_secs).map(Duration::from_secs),
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}

struct ConnectionState {
    connection: Option<Box<dyn SqlConnection>>,
    last_used: Option<Instant>,
    closed: bool,
}

/// One database the mapping reads from.
///
/// Statement execution is serialized on the connection. A connection that
/// was idle for longer than the keep-alive interval is pinged first and
/// replaced if the ping fails; a statement failing with a lost connection is
/// retried on a new connection a bounded number of times.
pub struct ConnectedDb {
    id: DatabaseId,
    dialect: Arc<dyn SqlDialect>,
    column_types: ColumnTypes,
    options: DatabaseOptions,
    factory: Box<dyn ConnectionFactory>,
    state: Mutex<ConnectionState>,
}

impl ConnectedDb {
    pub fn new(
        id: DatabaseId,
        dialect: Arc<dyn SqlDialect>,
        factory: Box<dyn ConnectionFactory>,
        options: DatabaseOptions,
    ) -> Self {
        ConnectedDb {
            id,
            dialect,
            column_types: ColumnTypes::default(),
            options,
            factory,
            state: Mutex::new(ConnectionState {
                connection: None,
                last_used: None,
                closed: false,
            }),
        }
    }

    pub fn with_column_types(mut self, column_types: ColumnTypes) -> Self {
        self.column_types = column_types;
        self
    }

    pub fn id(&self) -> &DatabaseId {
        &self.id
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn column_types(&self) -> &ColumnTypes {
        &self.column_types
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// Fills in the statement settings configured for this database.
    pub fn prepare(&self, sql: String, columns: Vec<ProjectionSpec>) -> SqlQuery {
        SqlQuery {
            sql,
            columns,
            fetch_size: self.options.fetch_size,
            timeout: self.options.statement_timeout,
        }
    }

    pub fn execute(&self, query: &SqlQuery) -> Result<Box<dyn RowCursor>, ExecutionError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ExecutionError::Closed);
        }
        let mut attempts = 0;
        loop {
            self.ensure_connection(&mut state)?;
            let Some(connection) = state.connection.as_mut() else {
                return Err(ExecutionError::Closed);
            };
            log::debug!("ConnectedDb[{}]: executing {}", self.id, query.sql);
            match connection.execute(query) {
                Ok(cursor) => {
                    state.last_used = Some(Instant::now());
                    return Ok(cursor);
                }
                Err(e) if e.is_retryable() => {
                    Self::drop_connection(&mut state);
                    if attempts >= self.options.max_reconnect_attempts {
                        return Err(e);
                    }
                    attempts += 1;
                    log::warn!(
                        "ConnectedDb[{}]: {}; reconnecting (attempt {}/{})",
                        self.id,
                        e,
                        attempts,
                        self.options.max_reconnect_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn ensure_connection(&self, state: &mut ConnectionState) -> Result<(), ExecutionError> {
        let idle_too_long = match (self.options.keep_alive, state.last_used) {
            (Some(keep_alive), Some(last_used)) => last_used.elapsed() >= keep_alive,
            _ => false,
        };
        if idle_too_long {
            if let Some(connection) = state.connection.as_mut() {
                if let Err(e) = connection.ping() {
                    log::warn!(
                        "ConnectedDb[{}]: keep-alive probe failed ({}), reconnecting",
                        self.id,
                        e
                    );
                    Self::drop_connection(state);
                }
            }
        }
        if state.connection.is_none() {
            log::info!("ConnectedDb[{}]: connecting", self.id);
            state.connection = Some(self.factory.connect()?);
            state.last_used = Some(Instant::now());
        }
        Ok(())
    }

    fn drop_connection(state: &mut ConnectionState) {
        if let Some(mut connection) = state.connection.take() {
            connection.close();
        }
    }

    /// Closes the connection; later statements fail with
    /// [`ExecutionError::Closed`].
    pub fn close(&self) {
        let mut state = self.state.lock();
        Self::drop_connection(&mut state);
        state.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl fmt::Debug for ConnectedDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedDb")
            .field("id", &self.id)
            .field("dialect", &self.dialect.name())
            .field("options", &self.options)
            .finish()
    }
}
