//! The read-only graph over mapped databases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::cache::{CacheMetrics, TripleCache, TripleCacheConfig};
use super::errors::GraphError;
use super::find_query::{Databases, FindQuery, QueryPlan};
use super::iter::{BindingIter, PlannedJoin, TripleIter};
use super::pattern::{Bindings, TriplePattern};
use crate::algebra::errors::CompileError;
use crate::config::EngineConfig;
use crate::sql::connection::{ConnectedDb, ResultRow};
use crate::sql::select_builder::SelectStatementBuilder;
use crate::triples::{TripleRelation, TripleRelationJoiner};

/// Answers triple patterns from compiled bridges.
///
/// Safe to share between threads; statements against one database are
/// serialized by its [`ConnectedDb`].
pub struct MappedGraph {
    bridges: RwLock<Arc<Vec<TripleRelation>>>,
    databases: Databases,
    cache: TripleCache,
    closed: AtomicBool,
}

impl MappedGraph {
    pub fn new(
        bridges: Vec<TripleRelation>,
        databases: Vec<Arc<ConnectedDb>>,
        config: &EngineConfig,
    ) -> Self {
        log::info!(
            "MappedGraph: {} bridges over {} database(s)",
            bridges.len(),
            databases.len()
        );
        MappedGraph {
            bridges: RwLock::new(Arc::new(bridges)),
            databases: databases
                .into_iter()
                .map(|db| (db.id().clone(), db))
                .collect(),
            cache: TripleCache::new(TripleCacheConfig::from_config(config)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn bridges(&self) -> Arc<Vec<TripleRelation>> {
        self.bridges.read().clone()
    }

    fn check_open(&self) -> Result<(), GraphError> {
        if self.closed.load(Ordering::Acquire) {
            Err(GraphError::Closed)
        } else {
            Ok(())
        }
    }

    /// The statements a lookup of `pattern` would run.
    pub fn plan(&self, pattern: &TriplePattern) -> Result<QueryPlan, GraphError> {
        self.check_open()?;
        let bridges = self.bridges();
        FindQuery::new(pattern, &bridges, &self.databases).plan()
    }

    /// Triples matching `pattern`.
    ///
    /// Without the cache the result is lazy. With it, a miss runs the lookup
    /// to completion and stores the list before returning it.
    pub fn find(&self, pattern: &TriplePattern) -> Result<TripleIter, GraphError> {
        self.check_open()?;
        if !self.cache.is_enabled() {
            return Ok(TripleIter::new(pattern.clone(), self.plan(pattern)?));
        }
        if let Some(triples) = self.cache.get(pattern) {
            log::debug!("MappedGraph: cache hit for {}", pattern);
            return Ok(TripleIter::from_cached(pattern.clone(), triples));
        }
        let triples = TripleIter::new(pattern.clone(), self.plan(pattern)?)
            .collect::<Result<Vec<_>, _>>()?;
        let triples = Arc::new(triples);
        self.cache.insert(pattern.clone(), triples.clone());
        Ok(TripleIter::from_cached(pattern.clone(), triples))
    }

    /// Solutions of a basic graph pattern: every combination of bridges
    /// that can answer the patterns is joined into one statement.
    pub fn find_bindings(&self, patterns: &[TriplePattern]) -> Result<BindingIter, GraphError> {
        self.check_open()?;
        if patterns.is_empty() {
            return Ok(BindingIter::new(vec![Bindings::new()], Vec::new()));
        }
        let bridges = self.bridges();
        let candidates: Vec<Vec<&TripleRelation>> = patterns
            .iter()
            .map(|p| {
                bridges
                    .iter()
                    .filter(|b| b.select_triple(p).is_some())
                    .collect()
            })
            .collect();

        let mut constants = Vec::new();
        let mut joins = Vec::new();
        for combination in cartesian(&candidates) {
            let joiner = patterns
                .iter()
                .zip(&combination)
                .fold(TripleRelationJoiner::new(), |j, (p, b)| j.add(p, b));
            let outcome = joiner.join()?;
            if outcome.is_empty() {
                continue;
            }
            if outcome.relation.is_trivial() {
                if let Some(bindings) = outcome.make_bindings(&ResultRow::from_pairs(std::iter::empty())) {
                    constants.push(bindings);
                }
                continue;
            }
            let Some(database_id) = outcome.relation.database() else {
                continue;
            };
            let database = self.databases.get(database_id).ok_or_else(|| {
                CompileError::UnknownDatabase {
                    bridge: combination
                        .iter()
                        .map(|b| b.name())
                        .collect::<Vec<_>>()
                        .join("+"),
                    database: database_id.to_string(),
                }
            })?;
            let relation = outcome
                .relation
                .with_limit(database.options().result_size_limit);
            let builder =
                SelectStatementBuilder::new(&relation, database.dialect(), database.column_types());
            let sql = builder.to_sql();
            log::debug!("MappedGraph: join of {} patterns -> {}", patterns.len(), sql);
            joins.push(PlannedJoin {
                database: database.clone(),
                query: database.prepare(sql, builder.into_columns()),
                outcome,
            });
        }
        Ok(BindingIter::new(constants, joins))
    }

    /// Whether the graph has no triples at all. Stops at the first one.
    pub fn is_empty(&self) -> Result<bool, GraphError> {
        let pattern = TriplePattern::any();
        let mut triples = TripleIter::new(pattern.clone(), self.plan(&pattern)?);
        match triples.next() {
            None => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(e)) => Err(e),
        }
    }

    /// Closes every database; later lookups fail with [`GraphError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for database in self.databases.values() {
            database.close();
        }
        self.cache.clear();
        log::info!("MappedGraph: closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Replaces the compiled bridges after the mapping changed. Cached
    /// results are dropped.
    pub fn recompile(&self, bridges: Vec<TripleRelation>) {
        log::info!("MappedGraph: recompiled with {} bridges", bridges.len());
        *self.bridges.write() = Arc::new(bridges);
        self.cache.clear();
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    pub fn set_cache_capacity(&self, max_entries: usize) {
        self.cache.set_capacity(max_entries);
    }

    /// Drops cached results, e.g. after the database contents changed.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }
}

/// Every way of picking one element from each list.
fn cartesian<'a, T>(lists: &[Vec<&'a T>]) -> Vec<Vec<&'a T>> {
    lists.iter().fold(vec![Vec::new()], |acc, list| {
        acc.iter()
            .flat_map(|prefix| {
                list.iter().map(move |item| {
                    let mut next = prefix.clone();
                    next.push(*item);
                    next
                })
            })
            .collect()
    })
}
