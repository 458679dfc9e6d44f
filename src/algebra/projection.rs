use std::collections::BTreeSet;
use std::fmt;

use super::alias_map::ColumnRenamer;
use super::attribute::Attribute;
use super::expression::Expression;
use crate::sql::dialect::SqlContext;

/// One entry of a SELECT list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectionSpec {
    Attribute(Attribute),
    /// A computed value, e.g. from a SQL-expression value maker.
    Expression(Expression),
    /// Projects `1` when the condition holds for the row and `0` otherwise.
    /// Used to tell apart the members of an OR-merged relation.
    Condition(Expression),
}

impl ProjectionSpec {
    pub fn attributes(&self) -> BTreeSet<Attribute> {
        match self {
            ProjectionSpec::Attribute(a) => [a.clone()].into_iter().collect(),
            ProjectionSpec::Expression(e) | ProjectionSpec::Condition(e) => e.attributes(),
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> ProjectionSpec {
        match self {
            ProjectionSpec::Attribute(a) => ProjectionSpec::Attribute(renamer.apply_to_attribute(a)),
            ProjectionSpec::Expression(e) => ProjectionSpec::Expression(e.rename(renamer)),
            ProjectionSpec::Condition(e) => ProjectionSpec::Condition(e.rename(renamer)),
        }
    }

    pub fn to_sql(&self, ctx: &SqlContext<'_>) -> String {
        match self {
            ProjectionSpec::Attribute(a) => ctx.dialect.quote_attribute(a),
            ProjectionSpec::Expression(e) => format!("({})", e.to_sql(ctx)),
            ProjectionSpec::Condition(e) => {
                format!("CASE WHEN {} THEN 1 ELSE 0 END", e.to_sql(ctx))
            }
        }
    }
}

impl fmt::Display for ProjectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionSpec::Attribute(a) => write!(f, "{}", a),
            ProjectionSpec::Expression(e) => write!(f, "({})", e),
            ProjectionSpec::Condition(e) => write!(f, "CASE WHEN {} THEN 1 ELSE 0 END", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderSpec {
    expression: Expression,
    ascending: bool,
}

impl OrderSpec {
    pub fn ascending(expression: Expression) -> Self {
        OrderSpec {
            expression,
            ascending: true,
        }
    }

    pub fn descending(expression: Expression) -> Self {
        OrderSpec {
            expression,
            ascending: false,
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> OrderSpec {
        OrderSpec {
            expression: self.expression.rename(renamer),
            ascending: self.ascending,
        }
    }

    pub fn to_sql(&self, ctx: &SqlContext<'_>) -> String {
        let direction = if self.ascending { "" } else { " DESC" };
        format!("{}{}", self.expression.to_sql(ctx), direction)
    }
}
