//! Compiled mapping rules ("property bridges").

use std::collections::BTreeSet;
use std::fmt;

use oxrdf::Triple;

use crate::algebra::alias_map::ColumnRenamer;
use crate::algebra::errors::CompileError;
use crate::algebra::expression::Expression;
use crate::algebra::join_optimizer::JoinOptimizer;
use crate::algebra::projection::ProjectionSpec;
use crate::algebra::relation::{check_connected, Relation};
use crate::find::pattern::{make_triple, TriplePattern};
use crate::nodes::{NodeMaker, NodeSetConstraintBuilder};
use crate::sql::connection::ResultRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Subject, Position::Predicate, Position::Object];
}

/// One mapping rule: the relation rows come from, and how each row becomes a
/// triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleRelation {
    name: String,
    relation: Relation,
    subject: NodeMaker,
    predicate: NodeMaker,
    object: NodeMaker,
}

impl TripleRelation {
    /// Builds a bridge, adding the node makers' columns to the relation's
    /// projections.
    ///
    /// Fails when the relation can never produce a row, when the makers read
    /// tables the relation's joins do not connect, or when they read columns
    /// from a relation that is bound to no database.
    pub fn new(
        name: impl Into<String>,
        relation: Relation,
        subject: NodeMaker,
        predicate: NodeMaker,
        object: NodeMaker,
    ) -> Result<Self, CompileError> {
        let name = name.into();
        if relation.is_empty() {
            return Err(CompileError::UnsatisfiableRelation { bridge: name });
        }
        let mut projections = relation.projections().clone();
        for maker in [&subject, &predicate, &object] {
            projections.extend(maker.projection_specs());
        }
        if relation.database().is_none() {
            if let Some(attribute) = projections.iter().flat_map(|p| p.attributes()).next() {
                return Err(CompileError::MissingProjection {
                    bridge: name,
                    attribute: attribute.to_string(),
                });
            }
        }
        let relation = relation.with_projections(projections);
        check_connected(&relation).map_err(|e| e.in_bridge(&name))?;
        Ok(TripleRelation {
            name,
            relation,
            subject,
            predicate,
            object,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn subject(&self) -> &NodeMaker {
        &self.subject
    }

    pub fn predicate(&self) -> &NodeMaker {
        &self.predicate
    }

    pub fn object(&self) -> &NodeMaker {
        &self.object
    }

    pub fn node_maker(&self, position: Position) -> &NodeMaker {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    /// Columns the three node makers read.
    pub fn maker_projections(&self) -> BTreeSet<ProjectionSpec> {
        let mut out = self.subject.projection_specs();
        out.extend(self.predicate.projection_specs());
        out.extend(self.object.projection_specs());
        out
    }

    /// Narrows the bridge to `pattern`.
    ///
    /// `None` means no row of this bridge can match and no SQL needs to run
    /// for it. Otherwise bound positions become fixed makers, their
    /// conditions move into the relation and unused columns are dropped.
    pub fn select_triple(&self, pattern: &TriplePattern) -> Option<TripleRelation> {
        let mut conditions: Vec<Expression> = Vec::new();
        let subject = self.subject.select_node(&pattern.subject, &mut conditions);
        let predicate = self.predicate.select_node(&pattern.predicate, &mut conditions);
        let object = self.object.select_node(&pattern.object, &mut conditions);
        if subject.is_empty() || predicate.is_empty() || object.is_empty() {
            log::debug!("Bridge {}: pruned for {}", self.name, pattern);
            return None;
        }

        // (?x p ?x) needs both positions to produce the same node.
        let makers = [&subject, &predicate, &object];
        for positions in pattern.variables().values().filter(|p| p.len() > 1) {
            let mut builder = NodeSetConstraintBuilder::new();
            for &i in positions {
                builder.add_node_maker(makers[i]);
            }
            if builder.is_empty() {
                log::debug!("Bridge {}: repeated variable can never match", self.name);
                return None;
            }
            if !builder.is_unsupported() {
                conditions.push(builder.constraint());
            }
        }

        let relation = self.relation.select(conditions);
        if relation.is_empty() {
            log::debug!("Bridge {}: condition unsatisfiable for {}", self.name, pattern);
            return None;
        }
        let narrowed = TripleRelation {
            name: self.name.clone(),
            relation,
            subject,
            predicate,
            object,
        };
        Some(narrowed.with_minimal_projections())
    }

    /// Drops projections no node maker reads. Rows that only differed in a
    /// dropped column now collapse, so the relation loses its uniqueness.
    fn with_minimal_projections(self) -> TripleRelation {
        let needed = self.maker_projections();
        if &needed == self.relation.projections() {
            return self;
        }
        let relation = self
            .relation
            .with_projections(needed)
            .with_unique(false);
        TripleRelation { relation, ..self }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> TripleRelation {
        TripleRelation {
            name: self.name.clone(),
            relation: self.relation.rename(renamer),
            subject: self.subject.rename(renamer),
            predicate: self.predicate.rename(renamer),
            object: self.object.rename(renamer),
        }
    }

    /// Removes foreign-key joins the makers do not need.
    pub fn optimize(&self) -> TripleRelation {
        let optimized = JoinOptimizer::optimize(&self.relation);
        if optimized.renamer.is_empty() {
            return self.clone();
        }
        TripleRelation {
            name: self.name.clone(),
            relation: optimized.relation,
            subject: self.subject.rename(&optimized.renamer),
            predicate: self.predicate.rename(&optimized.renamer),
            object: self.object.rename(&optimized.renamer),
        }
    }

    /// All three makers are fixed and the relation has exactly one row.
    pub fn is_constant(&self) -> bool {
        self.relation.is_trivial()
            && self.subject.fixed_node().is_some()
            && self.predicate.fixed_node().is_some()
            && self.object.fixed_node().is_some()
    }

    pub fn make_triple(&self, row: &ResultRow) -> Option<Triple> {
        let subject = self.subject.make_node(row)?;
        let predicate = self.predicate.make_node(row)?;
        let object = self.object.make_node(row)?;
        make_triple(subject, predicate, object)
    }
}

impl fmt::Display for TripleRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bridge {} {{ {} {} {} from {} }}",
            self.name, self.subject, self.predicate, self.object, self.relation
        )
    }
}
