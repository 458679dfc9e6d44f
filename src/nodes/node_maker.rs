use std::collections::BTreeSet;
use std::fmt;

use oxrdf::Term;

use super::node_set_filter::NodeSetFilter;
use super::node_type::{boolean_db_forms, NodeType};
use crate::algebra::alias_map::ColumnRenamer;
use crate::algebra::expression::Expression;
use crate::algebra::projection::{OrderSpec, ProjectionSpec};
use crate::find::pattern::PatternNode;
use crate::sql::connection::ResultRow;
use crate::values::ValueMaker;

/// Produces one position of a triple from a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMaker {
    /// Never produces a node.
    Empty,
    /// Always produces the same node.
    Fixed(Term),
    Typed {
        node_type: NodeType,
        value_maker: ValueMaker,
        /// Distinct rows yield distinct nodes.
        unique: bool,
    },
}

impl NodeMaker {
    pub fn typed(node_type: NodeType, value_maker: ValueMaker, unique: bool) -> Self {
        NodeMaker::Typed {
            node_type,
            value_maker,
            unique,
        }
    }

    pub fn fixed(node: impl Into<Term>) -> Self {
        NodeMaker::Fixed(node.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, NodeMaker::Empty)
    }

    pub fn is_unique(&self) -> bool {
        match self {
            NodeMaker::Empty | NodeMaker::Fixed(_) => true,
            NodeMaker::Typed { unique, .. } => *unique,
        }
    }

    pub fn fixed_node(&self) -> Option<&Term> {
        match self {
            NodeMaker::Fixed(t) => Some(t),
            _ => None,
        }
    }

    pub fn make_node(&self, row: &ResultRow) -> Option<Term> {
        match self {
            NodeMaker::Empty => None,
            NodeMaker::Fixed(t) => Some(t.clone()),
            NodeMaker::Typed {
                node_type,
                value_maker,
                ..
            } => {
                let value = value_maker.make_value(row)?;
                node_type.make_node(&value)
            }
        }
    }

    /// Narrows the maker to `node`.
    ///
    /// Variables and wildcards leave the maker unchanged. A concrete node the
    /// maker can never produce gives [`NodeMaker::Empty`]; otherwise the
    /// result is a fixed maker and the condition the row must satisfy is
    /// pushed onto `conditions`.
    pub fn select_node(&self, node: &PatternNode, conditions: &mut Vec<Expression>) -> NodeMaker {
        let PatternNode::Concrete(term) = node else {
            return self.clone();
        };
        match self {
            NodeMaker::Empty => NodeMaker::Empty,
            NodeMaker::Fixed(fixed) => {
                if fixed == term {
                    self.clone()
                } else {
                    NodeMaker::Empty
                }
            }
            NodeMaker::Typed {
                node_type,
                value_maker,
                ..
            } => {
                let Some(value) = node_type.extract_value(term) else {
                    return NodeMaker::Empty;
                };
                let condition = match node_type {
                    NodeType::Boolean => match boolean_db_forms(&value) {
                        Some(forms) => Expression::disjunction(
                            forms.iter().map(|f| value_maker.value_expression(f)),
                        ),
                        None => Expression::False,
                    },
                    _ => value_maker.value_expression(&value),
                };
                if condition.is_false() {
                    return NodeMaker::Empty;
                }
                conditions.push(condition);
                NodeMaker::Fixed(term.clone())
            }
        }
    }

    pub fn describe_self(&self, filter: &mut dyn NodeSetFilter) {
        match self {
            NodeMaker::Empty => filter.limit_to_empty_set(),
            NodeMaker::Fixed(t) => filter.limit_to(t),
            NodeMaker::Typed {
                node_type,
                value_maker,
                ..
            } => {
                node_type.describe(filter);
                value_maker.describe_self(filter);
            }
        }
    }

    pub fn projection_specs(&self) -> BTreeSet<ProjectionSpec> {
        match self {
            NodeMaker::Typed { value_maker, .. } => value_maker.projection_specs(),
            _ => BTreeSet::new(),
        }
    }

    pub fn order_specs(&self, ascending: bool) -> Vec<OrderSpec> {
        match self {
            NodeMaker::Typed { value_maker, .. } => value_maker.order_specs(ascending),
            _ => Vec::new(),
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> NodeMaker {
        match self {
            NodeMaker::Typed {
                node_type,
                value_maker,
                unique,
            } => NodeMaker::Typed {
                node_type: node_type.clone(),
                value_maker: value_maker.rename(renamer),
                unique: *unique,
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for NodeMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMaker::Empty => write!(f, "Empty"),
            NodeMaker::Fixed(t) => write!(f, "Fixed({})", t),
            NodeMaker::Typed {
                node_type,
                value_maker,
                unique,
            } => {
                write!(f, "{}({})", node_type, value_maker)?;
                if *unique {
                    write!(f, " unique")?;
                }
                Ok(())
            }
        }
    }
}
