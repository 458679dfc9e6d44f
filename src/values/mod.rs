//! Value makers turn database rows into node values and node values back into
//! SQL conditions.

use std::collections::BTreeSet;
use std::fmt;

use crate::algebra::alias_map::ColumnRenamer;
use crate::algebra::attribute::Attribute;
use crate::algebra::expression::Expression;
use crate::algebra::projection::{OrderSpec, ProjectionSpec};
use crate::nodes::node_set_filter::NodeSetFilter;
use crate::sql::connection::ResultRow;

pub mod blank_node_id;
pub mod column;
pub mod constraints;
pub mod errors;
pub mod pattern;
pub mod sql_expression;
pub mod translation;

pub use blank_node_id::BlankNodeId;
pub use column::ColumnValue;
pub use constraints::ValueConstraints;
pub use errors::ValueError;
pub use pattern::{ColumnFunction, Pattern};
pub use sql_expression::SqlExpressionValue;
pub use translation::{TranslationTable, Translator, TranslatorRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMaker {
    Column(ColumnValue),
    Pattern(Pattern),
    BlankNodeId(BlankNodeId),
    Translated {
        inner: Box<ValueMaker>,
        translator: TranslatorRef,
    },
    Constrained {
        inner: Box<ValueMaker>,
        constraints: ValueConstraints,
    },
    SqlExpression(SqlExpressionValue),
}

impl ValueMaker {
    pub fn column(attribute: Attribute) -> Self {
        ValueMaker::Column(ColumnValue::new(attribute))
    }

    pub fn pattern(pattern: &str) -> Result<Self, ValueError> {
        Ok(ValueMaker::Pattern(Pattern::parse(pattern)?))
    }

    pub fn blank_node_id(scope: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        ValueMaker::BlankNodeId(BlankNodeId::new(scope, attributes))
    }

    pub fn sql_expression(sql: &str) -> Self {
        ValueMaker::SqlExpression(SqlExpressionValue::new(sql))
    }

    pub fn translated(self, translator: TranslatorRef) -> Self {
        ValueMaker::Translated {
            inner: Box::new(self),
            translator,
        }
    }

    pub fn constrained(self, constraints: ValueConstraints) -> Self {
        ValueMaker::Constrained {
            inner: Box::new(self),
            constraints,
        }
    }

    /// The value for `row`, or `None` if a column it reads is NULL.
    pub fn make_value(&self, row: &ResultRow) -> Option<String> {
        match self {
            ValueMaker::Column(c) => c.make_value(row),
            ValueMaker::Pattern(p) => p.make_value(row),
            ValueMaker::BlankNodeId(b) => b.make_value(row),
            ValueMaker::Translated { inner, translator } => {
                let db_value = inner.make_value(row)?;
                let value = translator.to_graph_value(&db_value);
                if value.is_none() {
                    log::debug!(
                        "ValueMaker: {} has no translation for `{}`",
                        translator.name(),
                        db_value
                    );
                }
                value
            }
            ValueMaker::Constrained { inner, .. } => inner.make_value(row),
            ValueMaker::SqlExpression(e) => e.make_value(row),
        }
    }

    /// The condition under which this maker produces exactly `value`;
    /// [`Expression::False`] when it never can.
    pub fn value_expression(&self, value: &str) -> Expression {
        match self {
            ValueMaker::Column(c) => c.value_expression(value),
            ValueMaker::Pattern(p) => p.value_expression(value),
            ValueMaker::BlankNodeId(b) => b.value_expression(value),
            ValueMaker::Translated { inner, translator } => match translator.to_db_value(value) {
                Some(db_value) => inner.value_expression(&db_value),
                None => Expression::False,
            },
            ValueMaker::Constrained { inner, constraints } => {
                if constraints.matches(value) {
                    inner.value_expression(value)
                } else {
                    Expression::False
                }
            }
            ValueMaker::SqlExpression(e) => e.value_expression(value),
        }
    }

    pub fn describe_self(&self, filter: &mut dyn NodeSetFilter) {
        match self {
            ValueMaker::Column(c) => filter.limit_values_to_attribute(c.attribute()),
            ValueMaker::Pattern(p) => filter.limit_values_to_pattern(p),
            ValueMaker::BlankNodeId(b) => filter.limit_values_to_blank_node_id(b),
            ValueMaker::Translated { inner, translator } => {
                filter.set_uses_translator(translator);
                inner.describe_self(filter);
            }
            ValueMaker::Constrained { inner, .. } => inner.describe_self(filter),
            ValueMaker::SqlExpression(e) => filter.limit_values_to_expression(e.expression()),
        }
    }

    pub fn projection_specs(&self) -> BTreeSet<ProjectionSpec> {
        match self {
            ValueMaker::Column(c) => [c.projection_spec()].into_iter().collect(),
            ValueMaker::Pattern(p) => p.projection_specs().collect(),
            ValueMaker::BlankNodeId(b) => b.projection_specs().collect(),
            ValueMaker::Translated { inner, .. } | ValueMaker::Constrained { inner, .. } => {
                inner.projection_specs()
            }
            ValueMaker::SqlExpression(e) => [e.projection_spec()].into_iter().collect(),
        }
    }

    pub fn order_specs(&self, ascending: bool) -> Vec<OrderSpec> {
        match self {
            ValueMaker::Column(c) => {
                let e = Expression::attribute(c.attribute().clone());
                vec![if ascending {
                    OrderSpec::ascending(e)
                } else {
                    OrderSpec::descending(e)
                }]
            }
            ValueMaker::Pattern(p) => p.order_specs(ascending),
            ValueMaker::BlankNodeId(b) => b.order_specs(ascending),
            ValueMaker::Translated { inner, .. } | ValueMaker::Constrained { inner, .. } => {
                inner.order_specs(ascending)
            }
            ValueMaker::SqlExpression(e) => vec![e.order_spec(ascending)],
        }
    }

    /// Whether distinct inputs always give distinct values, so that distinct
    /// rows yield distinct nodes.
    pub fn is_unique(&self) -> bool {
        match self {
            ValueMaker::Column(_) | ValueMaker::Pattern(_) | ValueMaker::BlankNodeId(_) => true,
            ValueMaker::Translated { inner, .. } | ValueMaker::Constrained { inner, .. } => {
                inner.is_unique()
            }
            ValueMaker::SqlExpression(_) => false,
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> ValueMaker {
        match self {
            ValueMaker::Column(c) => ValueMaker::Column(c.rename(renamer)),
            ValueMaker::Pattern(p) => ValueMaker::Pattern(p.rename(renamer)),
            ValueMaker::BlankNodeId(b) => ValueMaker::BlankNodeId(b.rename(renamer)),
            ValueMaker::Translated { inner, translator } => ValueMaker::Translated {
                inner: Box::new(inner.rename(renamer)),
                translator: translator.clone(),
            },
            ValueMaker::Constrained { inner, constraints } => ValueMaker::Constrained {
                inner: Box::new(inner.rename(renamer)),
                constraints: constraints.clone(),
            },
            ValueMaker::SqlExpression(e) => ValueMaker::SqlExpression(e.rename(renamer)),
        }
    }
}

impl fmt::Display for ValueMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMaker::Column(c) => write!(f, "{}", c),
            ValueMaker::Pattern(p) => write!(f, "Pattern({})", p),
            ValueMaker::BlankNodeId(b) => write!(f, "{}", b),
            ValueMaker::Translated { inner, translator } => {
                write!(f, "Translated({}, {})", inner, translator.name())
            }
            ValueMaker::Constrained { inner, constraints } => {
                write!(f, "Constrained({}, {})", inner, constraints)
            }
            ValueMaker::SqlExpression(e) => write!(f, "{}", e),
        }
    }
}
