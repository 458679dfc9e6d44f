//! Joins the bridges chosen for several triple patterns that share
//! variables into one relation.
//!
//! Tables used by more than one bridge are aliased `T<n>_<table>`, where `n`
//! is the 1-based position of the later bridge. Every shared variable goes
//! through the constraint solver; agreements it cannot express in SQL are
//! returned as post-filters instead.

use std::collections::{BTreeMap, BTreeSet};

use crate::algebra::alias_map::AliasMap;
use crate::algebra::attribute::RelationName;
use crate::algebra::errors::CompileError;
use crate::algebra::expression::Expression;
use crate::algebra::relation::Relation;
use crate::find::pattern::{Bindings, TriplePattern};
use crate::nodes::{NodeMaker, NodeSetConstraintBuilder};
use crate::sql::connection::ResultRow;

use super::triple_relation::{Position, TripleRelation};

/// The joined relation plus how to read each variable from its rows.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub relation: Relation,
    /// One maker per variable.
    pub variables: BTreeMap<String, NodeMaker>,
    /// Makers that must produce equal nodes, checked per row.
    pub post_filters: Vec<Vec<NodeMaker>>,
    /// Some shared variable could not be turned into a SQL condition.
    pub unsupported: bool,
}

impl JoinOutcome {
    fn empty() -> Self {
        JoinOutcome {
            relation: Relation::empty(),
            variables: BTreeMap::new(),
            post_filters: Vec::new(),
            unsupported: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.relation.is_empty()
    }

    /// Reads the variables from one row. `None` when a variable is NULL or a
    /// post-filter rejects the row.
    pub fn make_bindings(&self, row: &ResultRow) -> Option<Bindings> {
        for group in &self.post_filters {
            let mut nodes = group.iter().map(|m| m.make_node(row));
            let first = nodes.next()??;
            for node in nodes {
                if node? != first {
                    return None;
                }
            }
        }
        self.variables
            .iter()
            .map(|(name, maker)| Some((name.clone(), maker.make_node(row)?)))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct TripleRelationJoiner {
    parts: Vec<(TriplePattern, TripleRelation)>,
    used_tables: BTreeSet<RelationName>,
    empty: bool,
}

impl TripleRelationJoiner {
    pub fn new() -> Self {
        TripleRelationJoiner::default()
    }

    /// Adds one pattern with the bridge answering it.
    pub fn add(mut self, pattern: &TriplePattern, bridge: &TripleRelation) -> Self {
        if self.empty {
            return self;
        }
        let Some(selected) = bridge.select_triple(pattern) else {
            self.empty = true;
            return self;
        };
        let index = self.parts.len() + 1;
        let tables = selected.relation().relation_names();
        let aliases = AliasMap::from_pairs(
            tables
                .iter()
                .filter(|t| self.used_tables.contains(*t))
                .map(|t| {
                    let alias = RelationName::new(None, &format!("T{}_{}", index, t.flattened()));
                    (t.clone(), alias)
                }),
        );
        let selected = if aliases.is_empty() {
            selected
        } else {
            log::debug!("TripleRelationJoiner: aliasing {} as {}", bridge.name(), aliases);
            selected.rename(&aliases)
        };
        self.used_tables.extend(selected.relation().relation_names());
        self.parts.push((pattern.clone(), selected));
        self
    }

    pub fn join(self) -> Result<JoinOutcome, CompileError> {
        if self.empty || self.parts.is_empty() {
            return Ok(JoinOutcome::empty());
        }
        let mut occurrences: BTreeMap<String, Vec<NodeMaker>> = BTreeMap::new();
        for (pattern, bridge) in &self.parts {
            for (node, position) in pattern.positions().into_iter().zip(Position::ALL) {
                if let Some(name) = node.variable_name() {
                    occurrences
                        .entry(name.to_string())
                        .or_default()
                        .push(bridge.node_maker(position).clone());
                }
            }
        }

        let mut conditions: Vec<Expression> = Vec::new();
        let mut post_filters = Vec::new();
        let mut unsupported = false;
        for (name, makers) in &occurrences {
            if makers.len() < 2 {
                continue;
            }
            let mut builder = NodeSetConstraintBuilder::new();
            for maker in makers {
                builder.add_node_maker(maker);
            }
            if builder.is_empty() {
                log::debug!("TripleRelationJoiner: ?{} can never match", name);
                return Ok(JoinOutcome::empty());
            }
            if builder.is_unsupported() {
                log::debug!("TripleRelationJoiner: ?{} compared after the fact", name);
                unsupported = true;
                post_filters.push(makers.clone());
            } else {
                conditions.push(builder.constraint());
            }
        }

        let relations: Vec<Relation> = self.parts.iter().map(|(_, b)| b.relation().clone()).collect();
        let relation = Relation::combine(&relations)?.select(conditions);
        if relation.is_empty() {
            return Ok(JoinOutcome::empty());
        }
        let variables = occurrences
            .into_iter()
            .filter_map(|(name, makers)| Some((name, makers.into_iter().next()?)))
            .collect();
        Ok(JoinOutcome {
            relation,
            variables,
            post_filters,
            unsupported,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::attribute::Attribute;
    use crate::algebra::projection::ProjectionSpec;
    use crate::algebra::relation::DatabaseId;
    use crate::find::pattern::PatternNode;
    use crate::nodes::NodeType;
    use crate::values::{TranslationTable, TranslatorRef, ValueMaker};
    use oxrdf::NamedNode;

    fn attr(s: &str) -> Attribute {
        Attribute::parse(s).unwrap()
    }

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    fn paper_uri(column: &str) -> NodeMaker {
        NodeMaker::typed(
            NodeType::Uri,
            ValueMaker::pattern(&format!("http://ex/paper/@@{}@@", column)).unwrap(),
            true,
        )
    }

    /// papers.id -> papers.cites, restricted by `condition`.
    fn cites_bridge(condition: &str) -> TripleRelation {
        let relation = Relation::builder(DatabaseId::new("db"))
            .condition(Expression::sql(condition))
            .unique(true)
            .build()
            .unwrap();
        TripleRelation::new(
            "cites",
            relation,
            paper_uri("papers.id"),
            NodeMaker::fixed(iri("http://ex/cites")),
            paper_uri("papers.cites"),
        )
        .unwrap()
    }

    fn pattern(s: &str, p: &str, o: &str) -> TriplePattern {
        TriplePattern::new(
            PatternNode::variable(s),
            PatternNode::concrete(iri(p)),
            PatternNode::variable(o),
        )
    }

    #[test]
    fn test_self_join_aliases_second_bridge() {
        let bridge = cites_bridge("papers.year > 2000");
        let outcome = TripleRelationJoiner::new()
            .add(&pattern("a", "http://ex/cites", "b"), &bridge)
            .add(&pattern("b", "http://ex/cites", "c"), &bridge)
            .join()
            .unwrap();
        assert!(!outcome.unsupported);
        let condition = outcome.relation.condition().to_string();
        // Both filters survive, the second on the aliased table.
        assert!(condition.contains("papers.year > 2000"), "{}", condition);
        assert!(condition.contains("T2_papers.year > 2000"), "{}", condition);
        assert!(condition.contains("T2_papers.id = papers.cites"), "{}", condition);
        assert_eq!(
            outcome.relation.aliases().original_of(&RelationName::new(None, "T2_papers")),
            RelationName::new(None, "papers")
        );
        assert_eq!(outcome.variables.len(), 3);
        assert_eq!(
            outcome.variables["c"].projection_specs(),
            [ProjectionSpec::Attribute(attr("T2_papers.cites"))].into_iter().collect()
        );
    }

    #[test]
    fn test_incompatible_shared_variable_empties_join() {
        let bridge = cites_bridge("papers.year > 2000");
        let literal_bridge = TripleRelation::new(
            "title",
            Relation::builder(DatabaseId::new("db")).unique(true).build().unwrap(),
            NodeMaker::typed(NodeType::PlainLiteral, ValueMaker::column(attr("papers.title")), false),
            NodeMaker::fixed(iri("http://ex/label")),
            NodeMaker::typed(NodeType::PlainLiteral, ValueMaker::column(attr("papers.title")), false),
        )
        .unwrap();
        let outcome = TripleRelationJoiner::new()
            .add(&pattern("a", "http://ex/cites", "b"), &bridge)
            .add(&pattern("b", "http://ex/label", "c"), &literal_bridge)
            .join()
            .unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_translated_join_is_post_filtered() {
        let table = TranslatorRef::new(TranslationTable::with_pairs("codes", [("A", "alpha")]));
        let translated = TripleRelation::new(
            "code",
            Relation::builder(DatabaseId::new("db")).unique(true).build().unwrap(),
            NodeMaker::typed(NodeType::Uri, ValueMaker::pattern("http://ex/item/@@items.id@@").unwrap(), true),
            NodeMaker::fixed(iri("http://ex/code")),
            NodeMaker::typed(
                NodeType::PlainLiteral,
                ValueMaker::column(attr("items.code")).translated(table),
                false,
            ),
        )
        .unwrap();
        let plain = TripleRelation::new(
            "label",
            Relation::builder(DatabaseId::new("db")).unique(true).build().unwrap(),
            NodeMaker::typed(NodeType::Uri, ValueMaker::pattern("http://ex/tag/@@tags.id@@").unwrap(), true),
            NodeMaker::fixed(iri("http://ex/label")),
            NodeMaker::typed(NodeType::PlainLiteral, ValueMaker::column(attr("tags.label")), false),
        )
        .unwrap();
        let outcome = TripleRelationJoiner::new()
            .add(&pattern("i", "http://ex/code", "v"), &translated)
            .add(&pattern("t", "http://ex/label", "v"), &plain)
            .join()
            .unwrap();
        assert!(outcome.unsupported);
        assert_eq!(outcome.post_filters.len(), 1);

        let row = |code: &str, label: &str| {
            ResultRow::from_pairs([
                (ProjectionSpec::Attribute(attr("items.id")), Some("1".to_string())),
                (ProjectionSpec::Attribute(attr("items.code")), Some(code.to_string())),
                (ProjectionSpec::Attribute(attr("tags.id")), Some("9".to_string())),
                (ProjectionSpec::Attribute(attr("tags.label")), Some(label.to_string())),
            ])
        };
        assert!(outcome.make_bindings(&row("A", "alpha")).is_some());
        assert!(outcome.make_bindings(&row("A", "beta")).is_none());
    }
}
