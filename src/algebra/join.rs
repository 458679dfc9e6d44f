use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::alias_map::ColumnRenamer;
use super::attribute::{Attribute, RelationName};
use super::errors::CompileError;
use super::expression::Expression;

/// Which side of a join, if any, is known to reference the other through a
/// foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinDirection {
    /// The left attributes are a foreign key referencing the right ones.
    LeftToRight,
    /// The right attributes are a foreign key referencing the left ones.
    RightToLeft,
    Undirected,
}

impl JoinDirection {
    pub fn reversed(self) -> Self {
        match self {
            JoinDirection::LeftToRight => JoinDirection::RightToLeft,
            JoinDirection::RightToLeft => JoinDirection::LeftToRight,
            JoinDirection::Undirected => JoinDirection::Undirected,
        }
    }
}

/// An equi-join between two tables over one or more attribute pairs.
///
/// Joins are stored with the lexicographically smaller side first. Equality,
/// hashing and ordering ignore the direction, so a join and its mirror image
/// are the same join.
#[derive(Debug, Clone)]
pub struct Join {
    attributes1: Vec<Attribute>,
    attributes2: Vec<Attribute>,
    direction: JoinDirection,
}

impl Join {
    pub fn new(
        left: Vec<Attribute>,
        right: Vec<Attribute>,
        direction: JoinDirection,
    ) -> Result<Self, CompileError> {
        let describe = |attrs: &[Attribute]| {
            attrs
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let invalid = |detail: &str| CompileError::InvalidJoin {
            left: describe(&left[..]),
            right: describe(&right[..]),
            detail: detail.to_string(),
        };
        if left.is_empty() || left.len() != right.len() {
            return Err(invalid("both sides need the same, non-zero number of attributes"));
        }
        let single_table = |attrs: &[Attribute]| {
            attrs
                .iter()
                .all(|a| a.relation_name() == attrs[0].relation_name())
        };
        if !single_table(&left[..]) || !single_table(&right[..]) {
            return Err(invalid("each side must reference exactly one table"));
        }
        if left[0].relation_name() == right[0].relation_name() {
            return Err(invalid("a table cannot be joined with itself without an alias"));
        }
        Ok(Join::canonical(left, right, direction))
    }

    /// `left = right` over a single attribute pair.
    pub fn on(left: Attribute, right: Attribute, direction: JoinDirection) -> Result<Self, CompileError> {
        Join::new(vec![left], vec![right], direction)
    }

    fn canonical(left: Vec<Attribute>, right: Vec<Attribute>, direction: JoinDirection) -> Self {
        if left <= right {
            Join {
                attributes1: left,
                attributes2: right,
                direction,
            }
        } else {
            Join {
                attributes1: right,
                attributes2: left,
                direction: direction.reversed(),
            }
        }
    }

    pub fn attributes1(&self) -> &[Attribute] {
        &self.attributes1
    }

    pub fn attributes2(&self) -> &[Attribute] {
        &self.attributes2
    }

    pub fn table1(&self) -> &RelationName {
        self.attributes1[0].relation_name()
    }

    pub fn table2(&self) -> &RelationName {
        self.attributes2[0].relation_name()
    }

    pub fn direction(&self) -> JoinDirection {
        self.direction
    }

    pub fn contains_relation(&self, name: &RelationName) -> bool {
        self.table1() == name || self.table2() == name
    }

    pub fn other_table(&self, name: &RelationName) -> Option<&RelationName> {
        if self.table1() == name {
            Some(self.table2())
        } else if self.table2() == name {
            Some(self.table1())
        } else {
            None
        }
    }

    /// The attribute paired with `attribute` on the other side, if any.
    pub fn equal_attribute(&self, attribute: &Attribute) -> Option<&Attribute> {
        if let Some(i) = self.attributes1.iter().position(|a| a == attribute) {
            return Some(&self.attributes2[i]);
        }
        self.attributes2
            .iter()
            .position(|a| a == attribute)
            .map(|i| &self.attributes1[i])
    }

    /// The table that is referenced by a foreign key on the other side.
    pub fn referenced_table(&self) -> Option<&RelationName> {
        match self.direction {
            JoinDirection::LeftToRight => Some(self.table2()),
            JoinDirection::RightToLeft => Some(self.table1()),
            JoinDirection::Undirected => None,
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes1.iter().chain(self.attributes2.iter())
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Join {
        Join::canonical(
            self.attributes1
                .iter()
                .map(|a| renamer.apply_to_attribute(a))
                .collect(),
            self.attributes2
                .iter()
                .map(|a| renamer.apply_to_attribute(a))
                .collect(),
            self.direction,
        )
    }

    pub fn to_expression(&self) -> Expression {
        Expression::conjunction(
            self.attributes1
                .iter()
                .zip(self.attributes2.iter())
                .map(|(a, b)| Expression::attribute_equality(a, b)),
        )
    }
}

impl PartialEq for Join {
    fn eq(&self, other: &Self) -> bool {
        self.attributes1 == other.attributes1 && self.attributes2 == other.attributes2
    }
}

impl Eq for Join {}

impl Hash for Join {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attributes1.hash(state);
        self.attributes2.hash(state);
    }
}

impl PartialOrd for Join {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Join {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.attributes1, &self.attributes2).cmp(&(&other.attributes1, &other.attributes2))
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            JoinDirection::LeftToRight => "=>",
            JoinDirection::RightToLeft => "<=",
            JoinDirection::Undirected => "=",
        };
        let side = |attrs: &[Attribute]| {
            attrs
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "Join({} {} {})",
            side(&self.attributes1),
            arrow,
            side(&self.attributes2)
        )
    }
}
