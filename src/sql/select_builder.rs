//! Renders a [`Relation`] as a SELECT statement.

use super::dialect::{ColumnTypes, SqlContext, SqlDialect};
use crate::algebra::attribute::RelationName;
use crate::algebra::expression::Expression;
use crate::algebra::join::Join;
use crate::algebra::projection::ProjectionSpec;
use crate::algebra::relation::Relation;

/// Result columns are aliased `c0`, `c1`, ... in projection order.
pub fn column_alias(i: usize) -> String {
    format!("c{}", i)
}

pub struct SelectStatementBuilder<'a> {
    relation: &'a Relation,
    dialect: &'a dyn SqlDialect,
    column_types: &'a ColumnTypes,
    columns: Vec<ProjectionSpec>,
}

impl<'a> SelectStatementBuilder<'a> {
    pub fn new(
        relation: &'a Relation,
        dialect: &'a dyn SqlDialect,
        column_types: &'a ColumnTypes,
    ) -> Self {
        SelectStatementBuilder {
            relation,
            dialect,
            column_types,
            columns: relation.projections().iter().cloned().collect(),
        }
    }

    /// What each result column holds.
    pub fn columns(&self) -> &[ProjectionSpec] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<ProjectionSpec> {
        self.columns
    }

    pub fn to_sql(&self) -> String {
        let ctx = SqlContext::new(self.dialect, self.column_types, self.relation.aliases());
        let mut sql = String::from("SELECT ");
        if !self.relation.is_unique() {
            sql.push_str("DISTINCT ");
        }
        if let Some(prefix) = self.relation.limit().and_then(|l| self.dialect.limit_prefix(l)) {
            sql.push_str(&prefix);
            sql.push(' ');
        }

        if self.columns.is_empty() {
            sql.push('1');
        } else {
            let select_list: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} AS {}", c.to_sql(&ctx), column_alias(i)))
                .collect();
            sql.push_str(&select_list.join(", "));
        }

        let optional = self.relation.optional_relation_names();
        let mandatory: Vec<RelationName> = self
            .relation
            .relation_names()
            .into_iter()
            .filter(|n| !optional.contains(n))
            .collect();
        if !mandatory.is_empty() {
            let from: Vec<String> = mandatory.iter().map(|n| self.table_reference(n)).collect();
            sql.push_str(" FROM ");
            sql.push_str(&from.join(", "));
        }

        let (outer_joins, inner_joins): (Vec<&Join>, Vec<&Join>) = self
            .relation
            .joins()
            .iter()
            .partition(|j| optional.contains(j.table1()) || optional.contains(j.table2()));
        for name in &optional {
            let on: Vec<Expression> = outer_joins
                .iter()
                .filter(|j| j.contains_relation(name))
                .map(|j| j.to_expression())
                .collect();
            sql.push_str(" LEFT JOIN ");
            sql.push_str(&self.table_reference(name));
            sql.push_str(" ON ");
            sql.push_str(&Expression::conjunction(on).to_sql(&ctx));
        }

        let condition = Expression::conjunction(
            std::iter::once(self.relation.condition().clone())
                .chain(inner_joins.iter().map(|j| j.to_expression())),
        );
        if !condition.is_true() {
            sql.push_str(" WHERE ");
            sql.push_str(&condition.to_sql(&ctx));
        }

        if !self.relation.order().is_empty() {
            let order: Vec<String> = self.relation.order().iter().map(|o| o.to_sql(&ctx)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(suffix) = self.relation.limit().and_then(|l| self.dialect.limit_suffix(l)) {
            sql.push(' ');
            sql.push_str(&suffix);
        }
        sql
    }

    fn table_reference(&self, name: &RelationName) -> String {
        let aliases = self.relation.aliases();
        if aliases.is_alias(name) {
            format!(
                "{} AS {}",
                self.dialect.quote_relation_name(&aliases.original_of(name)),
                self.dialect.quote_relation_name(name)
            )
        } else {
            self.dialect.quote_relation_name(name)
        }
    }
}
