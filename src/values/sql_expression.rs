use std::fmt;

use crate::algebra::alias_map::ColumnRenamer;
use crate::algebra::expression::Expression;
use crate::algebra::projection::{OrderSpec, ProjectionSpec};
use crate::sql::connection::ResultRow;

/// A value computed by the database from a SQL expression, e.g.
/// `CONCAT(people.first, ' ', people.last)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlExpressionValue {
    expression: Expression,
}

impl SqlExpressionValue {
    pub fn new(sql: &str) -> Self {
        SqlExpressionValue {
            expression: Expression::sql(sql),
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn projection_spec(&self) -> ProjectionSpec {
        ProjectionSpec::Expression(self.expression.clone())
    }

    pub fn make_value(&self, row: &ResultRow) -> Option<String> {
        row.get(&self.projection_spec()).map(str::to_string)
    }

    pub fn value_expression(&self, value: &str) -> Expression {
        Expression::equality(self.expression.clone(), Expression::constant(value))
    }

    pub fn order_spec(&self, ascending: bool) -> OrderSpec {
        if ascending {
            OrderSpec::ascending(self.expression.clone())
        } else {
            OrderSpec::descending(self.expression.clone())
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Self {
        SqlExpressionValue {
            expression: self.expression.rename(renamer),
        }
    }
}

impl fmt::Display for SqlExpressionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqlExpression({})", self.expression)
    }
}
