//! In-process connection answering statements from scripted rows.
//!
//! Used by tests and dry runs. Every executed statement is logged, and rows
//! are written against projection names (`"papers.id"`) so scripts do not
//! depend on column positions.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::connection::{ConnectionFactory, RowCursor, SqlConnection, SqlQuery};
use super::errors::ExecutionError;

/// One scripted row: projection display name to value (`None` is NULL).
pub type ScriptedRow = BTreeMap<String, Option<String>>;

/// Builds a [`ScriptedRow`] from `(projection, value)` pairs.
pub fn row(pairs: &[(&str, &str)]) -> ScriptedRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect()
}

type Responder = Box<dyn Fn(&SqlQuery) -> Option<Vec<ScriptedRow>> + Send + Sync>;

#[derive(Default)]
struct Script {
    responders: Vec<Responder>,
    failures: VecDeque<ExecutionError>,
    statements: Vec<String>,
    connects: usize,
}

/// Hands out connections that share one script and statement log.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        ScriptedConnector::default()
    }

    /// Answers statements containing `fragment` with `rows`. Responders are
    /// tried in registration order.
    pub fn respond_when(&self, fragment: &str, rows: Vec<ScriptedRow>) {
        let fragment = fragment.to_string();
        self.respond_with(move |query| query.sql.contains(&fragment).then(|| rows.clone()));
    }

    pub fn respond_with(
        &self,
        responder: impl Fn(&SqlQuery) -> Option<Vec<ScriptedRow>> + Send + Sync + 'static,
    ) {
        self.script.lock().responders.push(Box::new(responder));
    }

    /// The next statement fails with `error` instead of running.
    pub fn fail_next(&self, error: ExecutionError) {
        self.script.lock().failures.push_back(error);
    }

    /// Every statement executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.script.lock().statements.clone()
    }

    pub fn execution_count(&self) -> usize {
        self.script.lock().statements.len()
    }

    pub fn connect_count(&self) -> usize {
        self.script.lock().connects
    }

    pub fn clear_log(&self) {
        self.script.lock().statements.clear();
    }
}

impl ConnectionFactory for ScriptedConnector {
    fn connect(&self) -> Result<Box<dyn SqlConnection>, ExecutionError> {
        self.script.lock().connects += 1;
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
            closed: false,
        }))
    }
}

pub struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
    closed: bool,
}

impl SqlConnection for ScriptedConnection {
    fn execute(&mut self, query: &SqlQuery) -> Result<Box<dyn RowCursor>, ExecutionError> {
        if self.closed {
            return Err(ExecutionError::Closed);
        }
        let mut script = self.script.lock();
        if let Some(error) = script.failures.pop_front() {
            return Err(error);
        }
        script.statements.push(query.sql.clone());
        let rows = script
            .responders
            .iter()
            .find_map(|responder| responder(query))
            .unwrap_or_default();
        let names: Vec<String> = query.columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                names
                    .iter()
                    .map(|name| row.get(name).cloned().flatten())
                    .collect()
            })
            .collect();
        Ok(Box::new(ScriptedCursor { rows }))
    }

    fn ping(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Err(ExecutionError::Closed);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

struct ScriptedCursor {
    rows: VecDeque<Vec<Option<String>>>,
}

impl RowCursor for ScriptedCursor {
    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>, ExecutionError> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.rows.clear();
    }
}
