use std::fmt;

use super::pattern::DELIMITER;
use crate::algebra::alias_map::ColumnRenamer;
use crate::algebra::attribute::Attribute;
use crate::algebra::expression::Expression;
use crate::algebra::projection::{OrderSpec, ProjectionSpec};
use crate::sql::connection::ResultRow;

/// Blank node labels of the form `scope@@v1@@v2`, where `scope` identifies
/// the mapping rule so that labels from different rules never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNodeId {
    scope: String,
    attributes: Vec<Attribute>,
}

impl BlankNodeId {
    pub fn new(scope: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        BlankNodeId {
            scope: scope.into(),
            attributes,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn make_value(&self, row: &ResultRow) -> Option<String> {
        let mut out = self.scope.clone();
        for attribute in &self.attributes {
            out.push_str(DELIMITER);
            out.push_str(row.get_attribute(attribute)?);
        }
        Some(out)
    }

    pub fn value_expression(&self, value: &str) -> Expression {
        let mut parts = value.split(DELIMITER);
        if parts.next() != Some(self.scope.as_str()) {
            return Expression::False;
        }
        let values: Vec<&str> = parts.collect();
        if values.len() != self.attributes.len() {
            return Expression::False;
        }
        Expression::conjunction(
            self.attributes
                .iter()
                .zip(values)
                .map(|(a, v)| Expression::attribute_value(a, v)),
        )
    }

    /// Same scope and arity: the labels agree exactly when the columns do.
    pub fn is_equivalent_to(&self, other: &BlankNodeId) -> bool {
        self.scope == other.scope && self.attributes.len() == other.attributes.len()
    }

    pub fn attribute_equalities(&self, other: &BlankNodeId) -> Expression {
        Expression::conjunction(
            self.attributes
                .iter()
                .zip(other.attributes.iter())
                .map(|(a, b)| Expression::attribute_equality(a, b)),
        )
    }

    pub fn to_expression(&self) -> Expression {
        let mut parts = vec![Expression::constant(self.scope.clone())];
        for attribute in &self.attributes {
            parts.push(Expression::constant(DELIMITER));
            parts.push(Expression::attribute(attribute.clone()));
        }
        Expression::concatenation(parts)
    }

    pub fn projection_specs(&self) -> impl Iterator<Item = ProjectionSpec> + '_ {
        self.attributes.iter().cloned().map(ProjectionSpec::Attribute)
    }

    pub fn order_specs(&self, ascending: bool) -> Vec<OrderSpec> {
        self.attributes
            .iter()
            .map(|a| {
                let e = Expression::attribute(a.clone());
                if ascending {
                    OrderSpec::ascending(e)
                } else {
                    OrderSpec::descending(e)
                }
            })
            .collect()
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> BlankNodeId {
        BlankNodeId {
            scope: self.scope.clone(),
            attributes: self
                .attributes
                .iter()
                .map(|a| renamer.apply_to_attribute(a))
                .collect(),
        }
    }
}

impl fmt::Display for BlankNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes: Vec<String> = self.attributes.iter().map(|a| a.to_string()).collect();
        write!(f, "BlankNodeId({}, [{}])", self.scope, attributes.join(", "))
    }
}
