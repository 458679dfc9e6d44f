//! Turns one triple pattern into the SQL statements that answer it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use oxrdf::Triple;

use super::errors::GraphError;
use super::pattern::TriplePattern;
use crate::algebra::compatible_group::CompatibleRelationGroup;
use crate::algebra::errors::CompileError;
use crate::algebra::projection::ProjectionSpec;
use crate::algebra::relation::{DatabaseId, Relation};
use crate::sql::connection::{ConnectedDb, ResultRow, SqlQuery};
use crate::sql::select_builder::SelectStatementBuilder;
use crate::triples::TripleRelation;

pub type Databases = HashMap<DatabaseId, Arc<ConnectedDb>>;

/// A bridge reading from a merged statement. With a discriminator, only rows
/// where that column is `1` belong to the bridge.
#[derive(Debug, Clone)]
pub struct StatementMember {
    pub bridge: TripleRelation,
    pub discriminator: Option<ProjectionSpec>,
}

impl StatementMember {
    pub fn applies_to(&self, row: &ResultRow) -> bool {
        match &self.discriminator {
            None => true,
            Some(spec) => matches!(row.get(spec), Some("1") | Some("true")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannedStatement {
    pub database: Arc<ConnectedDb>,
    pub query: SqlQuery,
    pub members: Vec<StatementMember>,
}

/// Everything needed to answer a pattern: triples known without touching a
/// database, and the statements to run for the rest.
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    pub constants: Vec<Triple>,
    pub statements: Vec<PlannedStatement>,
}

impl QueryPlan {
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.statements.is_empty()
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for triple in &self.constants {
            writeln!(f, "constant {}", triple)?;
        }
        for statement in &self.statements {
            writeln!(f, "[{}] {}", statement.database.id(), statement.query.sql)?;
        }
        Ok(())
    }
}

/// Plans a single pattern lookup over a set of bridges.
pub struct FindQuery<'a> {
    pattern: &'a TriplePattern,
    bridges: &'a [TripleRelation],
    databases: &'a Databases,
}

impl<'a> FindQuery<'a> {
    pub fn new(
        pattern: &'a TriplePattern,
        bridges: &'a [TripleRelation],
        databases: &'a Databases,
    ) -> Self {
        FindQuery {
            pattern,
            bridges,
            databases,
        }
    }

    /// Bridges narrowed to the pattern, with the ones that cannot match
    /// dropped.
    pub fn candidates(&self) -> Vec<TripleRelation> {
        self.bridges
            .iter()
            .filter_map(|b| b.select_triple(self.pattern))
            .map(|b| b.optimize())
            .collect()
    }

    pub fn plan(&self) -> Result<QueryPlan, GraphError> {
        let mut plan = QueryPlan::default();
        let mut pending: Vec<(Relation, TripleRelation)> = Vec::new();
        for bridge in self.candidates() {
            if bridge.is_constant() {
                if let Some(triple) = bridge.make_triple(&ResultRow::from_pairs(std::iter::empty())) {
                    if self.pattern.matches(&triple) {
                        plan.constants.push(triple);
                    }
                }
                continue;
            }
            pending.push((bridge.relation().clone(), bridge));
        }

        for group in CompatibleRelationGroup::group(pending) {
            let merged = group.merge();
            let Some(database_id) = merged.relation.database() else {
                continue;
            };
            let database = self.databases.get(database_id).ok_or_else(|| {
                let bridge = merged
                    .members
                    .first()
                    .map(|(b, _)| b.name().to_string())
                    .unwrap_or_default();
                CompileError::UnknownDatabase {
                    bridge,
                    database: database_id.to_string(),
                }
            })?;
            let relation = merged
                .relation
                .with_limit(database.options().result_size_limit);
            let builder =
                SelectStatementBuilder::new(&relation, database.dialect(), database.column_types());
            let sql = builder.to_sql();
            log::debug!(
                "FindQuery {}: {} bridge(s) -> {}",
                self.pattern,
                merged.members.len(),
                sql
            );
            plan.statements.push(PlannedStatement {
                database: database.clone(),
                query: database.prepare(sql, builder.into_columns()),
                members: merged
                    .members
                    .into_iter()
                    .map(|(bridge, discriminator)| StatementMember {
                        bridge,
                        discriminator,
                    })
                    .collect(),
            });
        }
        Ok(plan)
    }
}
