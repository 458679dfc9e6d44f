//! Lazy result sequences.
//!
//! Statements run only when the iterator is pulled past the results of the
//! previous one. [`TripleIter::close`] (or dropping the iterator) releases
//! the open cursor, also when the sequence was not exhausted.

use std::collections::VecDeque;
use std::sync::Arc;

use oxrdf::Triple;

use super::cache::CachedTriples;
use super::errors::GraphError;
use super::find_query::{PlannedStatement, QueryPlan, StatementMember};
use super::pattern::{Bindings, TriplePattern};
use crate::sql::connection::{column_index, ColumnIndex, ConnectedDb, ResultRow, RowCursor, SqlQuery};
use crate::sql::errors::ExecutionError;
use crate::triples::JoinOutcome;

/// Rows of one executing statement.
struct StatementRows {
    cursor: Option<Box<dyn RowCursor>>,
    index: ColumnIndex,
    rows: u64,
    skipped: u64,
    sql: String,
}

impl StatementRows {
    fn open(database: &ConnectedDb, query: &SqlQuery) -> Result<Self, ExecutionError> {
        let cursor = database.execute(query)?;
        Ok(StatementRows {
            cursor: Some(cursor),
            index: column_index(&query.columns),
            rows: 0,
            skipped: 0,
            sql: query.sql.clone(),
        })
    }

    /// The next row, or `None` once the statement is exhausted. The cursor
    /// is released at the end and on error.
    fn next_row(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        match cursor.next_row() {
            Ok(Some(values)) => {
                self.rows += 1;
                Ok(Some(ResultRow::new(self.index.clone(), values)))
            }
            Ok(None) => {
                self.close();
                Ok(None)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
            if self.skipped > 0 {
                log::debug!(
                    "{} of {} rows produced nothing: {}",
                    self.skipped,
                    self.rows,
                    self.sql
                );
            }
        }
    }
}

impl Drop for StatementRows {
    fn drop(&mut self) {
        self.close();
    }
}

enum Source {
    Cached {
        triples: CachedTriples,
        next: usize,
    },
    Planned {
        constants: std::vec::IntoIter<Triple>,
        statements: VecDeque<PlannedStatement>,
        current: Option<(StatementRows, Vec<StatementMember>)>,
        pending: VecDeque<Triple>,
    },
}

/// Single-pass sequence of the triples matching a pattern.
pub struct TripleIter {
    pattern: TriplePattern,
    source: Source,
    closed: bool,
}

impl TripleIter {
    pub fn new(pattern: TriplePattern, plan: QueryPlan) -> Self {
        TripleIter {
            pattern,
            source: Source::Planned {
                constants: plan.constants.into_iter(),
                statements: plan.statements.into(),
                current: None,
                pending: VecDeque::new(),
            },
            closed: false,
        }
    }

    pub fn from_cached(pattern: TriplePattern, triples: CachedTriples) -> Self {
        TripleIter {
            pattern,
            source: Source::Cached { triples, next: 0 },
            closed: false,
        }
    }

    pub fn empty(pattern: TriplePattern) -> Self {
        TripleIter::from_cached(pattern, Arc::new(Vec::new()))
    }

    pub fn pattern(&self) -> &TriplePattern {
        &self.pattern
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stops the sequence and releases any open cursor. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Source::Planned {
            statements,
            current,
            pending,
            ..
        } = &mut self.source
        {
            if let Some((mut rows, _)) = current.take() {
                rows.close();
            }
            statements.clear();
            pending.clear();
        }
    }

    fn next_planned(&mut self) -> Option<Result<Triple, GraphError>> {
        let Source::Planned {
            constants,
            statements,
            current,
            pending,
        } = &mut self.source
        else {
            return None;
        };
        loop {
            if let Some(triple) = pending.pop_front() {
                return Some(Ok(triple));
            }
            if let Some(triple) = constants.next() {
                return Some(Ok(triple));
            }
            if let Some((rows, members)) = current.as_mut() {
                match rows.next_row() {
                    Ok(Some(row)) => {
                        let before = pending.len();
                        for member in members.iter().filter(|m| m.applies_to(&row)) {
                            if let Some(triple) = member.bridge.make_triple(&row) {
                                if self.pattern.matches(&triple) {
                                    pending.push_back(triple);
                                }
                            }
                        }
                        if pending.len() == before {
                            rows.skipped += 1;
                        }
                    }
                    Ok(None) => *current = None,
                    Err(e) => return Some(Err(e.into())),
                }
                continue;
            }
            let statement = statements.pop_front()?;
            match StatementRows::open(&statement.database, &statement.query) {
                Ok(rows) => *current = Some((rows, statement.members)),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

impl Iterator for TripleIter {
    type Item = Result<Triple, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        let next = match &mut self.source {
            Source::Cached { triples, next } => {
                let triple = triples.get(*next).cloned();
                *next += 1;
                triple.map(Ok)
            }
            Source::Planned { .. } => self.next_planned(),
        };
        match next {
            Some(Ok(triple)) => Some(Ok(triple)),
            // Errors end the sequence.
            Some(Err(e)) => {
                self.close();
                Some(Err(e))
            }
            None => {
                self.close();
                None
            }
        }
    }
}

impl Drop for TripleIter {
    fn drop(&mut self) {
        self.close();
    }
}

/// One joined statement of a basic graph pattern.
pub struct PlannedJoin {
    pub database: Arc<ConnectedDb>,
    pub query: SqlQuery,
    pub outcome: JoinOutcome,
}

/// Single-pass sequence of variable bindings for a basic graph pattern.
pub struct BindingIter {
    constants: std::vec::IntoIter<Bindings>,
    joins: VecDeque<PlannedJoin>,
    current: Option<(StatementRows, JoinOutcome)>,
    closed: bool,
}

impl BindingIter {
    pub fn new(constants: Vec<Bindings>, joins: Vec<PlannedJoin>) -> Self {
        BindingIter {
            constants: constants.into_iter(),
            joins: joins.into(),
            current: None,
            closed: false,
        }
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some((mut rows, _)) = self.current.take() {
            rows.close();
        }
        self.joins.clear();
    }

    fn advance(&mut self) -> Option<Result<Bindings, GraphError>> {
        if let Some(bindings) = self.constants.next() {
            return Some(Ok(bindings));
        }
        loop {
            if let Some((rows, outcome)) = self.current.as_mut() {
                match rows.next_row() {
                    Ok(Some(row)) => match outcome.make_bindings(&row) {
                        Some(bindings) => return Some(Ok(bindings)),
                        None => rows.skipped += 1,
                    },
                    Ok(None) => self.current = None,
                    Err(e) => return Some(Err(e.into())),
                }
                continue;
            }
            let join = self.joins.pop_front()?;
            match StatementRows::open(&join.database, &join.query) {
                Ok(rows) => self.current = Some((rows, join.outcome)),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

impl Iterator for BindingIter {
    type Item = Result<Bindings, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        let next = self.advance();
        if !matches!(next, Some(Ok(_))) {
            self.close();
        }
        next
    }
}

impl Drop for BindingIter {
    fn drop(&mut self) {
        self.close();
    }
}
