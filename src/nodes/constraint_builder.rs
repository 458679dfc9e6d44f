//! Intersection of the node sets of several node makers.
//!
//! When two mapping rules share a variable, their node makers must produce
//! the same node. The builder collects what every maker reports about itself
//! and derives the SQL condition under which they agree, or proves that they
//! never can.

use std::collections::BTreeSet;

use oxrdf::vocab::xsd;
use oxrdf::{NamedNode, Term};

use super::node_maker::NodeMaker;
use super::node_set_filter::NodeSetFilter;
use super::node_type::{blank_node_value, boolean_db_forms};
use crate::algebra::attribute::Attribute;
use crate::algebra::expression::Expression;
use crate::values::{BlankNodeId, Pattern, TranslatorRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Uri,
    Blank,
    Literal {
        language: Option<String>,
        datatype: Option<NamedNode>,
    },
}

impl NodeKind {
    fn of(node: &Term) -> NodeKind {
        match node {
            Term::NamedNode(_) => NodeKind::Uri,
            Term::BlankNode(_) => NodeKind::Blank,
            Term::Literal(l) => match l.language() {
                Some(lang) => NodeKind::Literal {
                    language: Some(lang.to_ascii_lowercase()),
                    datatype: None,
                },
                None if l.datatype() == xsd::STRING => NodeKind::Literal {
                    language: None,
                    datatype: None,
                },
                None => NodeKind::Literal {
                    language: None,
                    datatype: Some(l.datatype().into_owned()),
                },
            },
            #[allow(unreachable_patterns)]
            _ => NodeKind::Blank,
        }
    }
}

fn lexical_value(node: &Term) -> String {
    match node {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::BlankNode(b) => blank_node_value(b).unwrap_or_else(|| b.as_str().to_string()),
        Term::Literal(l) => l.value().to_string(),
        #[allow(unreachable_patterns)]
        _ => node.to_string(),
    }
}

/// What is known so far about a satisfiable node set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSet {
    kind: Option<NodeKind>,
    fixed_node: Option<Term>,
    constant: Option<String>,
    /// Every value must start with this.
    value_start: String,
    /// Every value must end with this.
    value_end: String,
    attributes: BTreeSet<Attribute>,
    patterns: Vec<Pattern>,
    blank_node_ids: Vec<BlankNodeId>,
    expressions: BTreeSet<Expression>,
    translators: Vec<TranslatorRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuilderState {
    Collecting(Box<NodeSet>),
    /// Absorbing: no node satisfies every description seen so far.
    Unsatisfiable,
}

impl BuilderState {
    fn then(self, transition: impl FnOnce(NodeSet) -> BuilderState) -> BuilderState {
        match self {
            BuilderState::Collecting(set) => transition(*set),
            BuilderState::Unsatisfiable => BuilderState::Unsatisfiable,
        }
    }
}

impl NodeSet {
    fn collecting(self) -> BuilderState {
        BuilderState::Collecting(Box::new(self))
    }

    fn with_kind(mut self, kind: NodeKind) -> BuilderState {
        match &self.kind {
            Some(existing) if *existing != kind => BuilderState::Unsatisfiable,
            _ => {
                self.kind = Some(kind);
                self.collecting()
            }
        }
    }

    fn with_fixed_node(mut self, node: &Term) -> BuilderState {
        if self.fixed_node.as_ref().is_some_and(|n| n != node) {
            return BuilderState::Unsatisfiable;
        }
        self.fixed_node = Some(node.clone());
        let value = lexical_value(node);
        self.with_kind(NodeKind::of(node))
            .then(|set| set.with_constant(&value))
    }

    fn with_constant(mut self, value: &str) -> BuilderState {
        if self.constant.as_deref().is_some_and(|c| c != value) {
            return BuilderState::Unsatisfiable;
        }
        if !value.starts_with(&self.value_start) || !value.ends_with(&self.value_end) {
            return BuilderState::Unsatisfiable;
        }
        self.constant = Some(value.to_string());
        self.collecting()
    }

    fn with_attribute(mut self, attribute: &Attribute) -> BuilderState {
        self.attributes.insert(attribute.clone());
        self.collecting()
    }

    fn with_pattern(mut self, pattern: &Pattern) -> BuilderState {
        let Some(start) = longer_if_prefix(&self.value_start, pattern.first_literal_part()) else {
            return BuilderState::Unsatisfiable;
        };
        let Some(end) = longer_if_suffix(&self.value_end, pattern.last_literal_part()) else {
            return BuilderState::Unsatisfiable;
        };
        self.value_start = start;
        self.value_end = end;
        if let Some(constant) = &self.constant {
            if !constant.starts_with(&self.value_start) || !constant.ends_with(&self.value_end) {
                return BuilderState::Unsatisfiable;
            }
        }
        if !self.patterns.contains(pattern) {
            self.patterns.push(pattern.clone());
        }
        self.collecting()
    }

    fn with_blank_node_id(mut self, id: &BlankNodeId) -> BuilderState {
        if self.blank_node_ids.iter().any(|b| b.scope() != id.scope()) {
            return BuilderState::Unsatisfiable;
        }
        if !self.blank_node_ids.contains(id) {
            self.blank_node_ids.push(id.clone());
        }
        self.collecting()
    }

    fn with_expression(mut self, expression: &Expression) -> BuilderState {
        self.expressions.insert(expression.clone());
        self.collecting()
    }

    fn with_translator(mut self, translator: &TranslatorRef) -> BuilderState {
        if !self.translators.contains(translator) {
            self.translators.push(translator.clone());
        }
        self.collecting()
    }

    fn stored_forms<'a>(&self, constant: &'a str) -> Vec<&'a str> {
        let boolean = matches!(
            &self.kind,
            Some(NodeKind::Literal { datatype: Some(dt), .. }) if dt.as_ref() == xsd::BOOLEAN
        );
        match boolean_db_forms(constant) {
            Some(forms) if boolean => forms.to_vec(),
            _ => vec![constant],
        }
    }

    /// The agreement condition, and whether it could only be computed
    /// partially.
    fn evaluate(&self) -> (Expression, bool) {
        let mut unsupported = false;
        let mut parts = Vec::new();

        if let Some(constant) = &self.constant {
            // Every stored form of the constant, e.g. `1` and `true` for booleans.
            let forms = self.stored_forms(constant);
            let any_form = |condition: &dyn Fn(&str) -> Expression| {
                Expression::disjunction(forms.iter().map(|form| condition(*form)))
            };
            for a in &self.attributes {
                parts.push(any_form(&|form| Expression::attribute_value(a, form)));
            }
            for p in &self.patterns {
                parts.push(any_form(&|form| p.value_expression(form)));
            }
            for b in &self.blank_node_ids {
                parts.push(any_form(&|form| b.value_expression(form)));
            }
            for e in &self.expressions {
                parts.push(any_form(&|form| {
                    Expression::equality(e.clone(), Expression::constant(form))
                }));
            }
            return (Expression::conjunction(parts), unsupported);
        }

        let mut attributes = self.attributes.iter();
        if let Some(first) = attributes.next() {
            for other in attributes {
                parts.push(Expression::attribute_equality(first, other));
            }
        }

        if let Some((first, rest)) = self.patterns.split_first() {
            for other in rest {
                if first.is_equivalent_to(other) {
                    parts.push(first.attribute_equalities(other));
                } else if first.uses_column_functions() || other.uses_column_functions() {
                    unsupported = true;
                } else {
                    parts.push(Expression::equality(first.to_expression(), other.to_expression()));
                }
            }
        }

        if let Some((first, rest)) = self.blank_node_ids.split_first() {
            for other in rest {
                if first.is_equivalent_to(other) {
                    parts.push(first.attribute_equalities(other));
                } else {
                    parts.push(Expression::False);
                }
            }
        }

        let mut expressions = self.expressions.iter();
        if let Some(first) = expressions.next() {
            for other in expressions {
                parts.push(Expression::equality(first.clone(), other.clone()));
            }
        }

        // One representative per kind of description, equated to each other.
        let mut representatives = Vec::new();
        if let Some(a) = self.attributes.iter().next() {
            representatives.push(Expression::attribute(a.clone()));
        }
        if let Some(p) = self.patterns.first() {
            if p.uses_column_functions() {
                let others = !self.attributes.is_empty()
                    || !self.blank_node_ids.is_empty()
                    || !self.expressions.is_empty();
                unsupported |= others;
            } else {
                representatives.push(p.to_expression());
            }
        }
        if let Some(b) = self.blank_node_ids.first() {
            representatives.push(b.to_expression());
        }
        if let Some(e) = self.expressions.iter().next() {
            representatives.push(e.clone());
        }
        if let Some((first, rest)) = representatives.split_first() {
            for other in rest {
                parts.push(Expression::equality(first.clone(), other.clone()));
            }
        }

        (Expression::conjunction(parts), unsupported)
    }
}

fn longer_if_prefix(a: &str, b: &str) -> Option<String> {
    if a.starts_with(b) {
        Some(a.to_string())
    } else if b.starts_with(a) {
        Some(b.to_string())
    } else {
        None
    }
}

fn longer_if_suffix(a: &str, b: &str) -> Option<String> {
    if a.ends_with(b) {
        Some(a.to_string())
    } else if b.ends_with(a) {
        Some(b.to_string())
    } else {
        None
    }
}

/// Collects node set descriptions and emits the condition under which all of
/// them denote the same node.
#[derive(Debug, Clone)]
pub struct NodeSetConstraintBuilder {
    state: BuilderState,
    translated_makers: usize,
    untranslated_makers: usize,
    describing_uses_translator: bool,
}

impl Default for NodeSetConstraintBuilder {
    fn default() -> Self {
        NodeSetConstraintBuilder::new()
    }
}

impl NodeSetConstraintBuilder {
    pub fn new() -> Self {
        NodeSetConstraintBuilder {
            state: BuilderState::Collecting(Box::default()),
            translated_makers: 0,
            untranslated_makers: 0,
            describing_uses_translator: false,
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    /// Adds every node `maker` can produce as one more description.
    pub fn add_node_maker(&mut self, maker: &NodeMaker) {
        self.describing_uses_translator = false;
        maker.describe_self(self);
        if self.describing_uses_translator {
            self.translated_makers += 1;
        } else {
            self.untranslated_makers += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, BuilderState::Unsatisfiable)
    }

    /// Whether [`Self::constraint`] cannot express the agreement exactly.
    ///
    /// Set when different translators are involved, when translated values
    /// meet untranslated ones, or when patterns with column functions have to
    /// be compared as whole strings.
    pub fn is_unsupported(&self) -> bool {
        let BuilderState::Collecting(set) = &self.state else {
            return false;
        };
        set.translators.len() > 1
            || (self.translated_makers > 0 && self.untranslated_makers > 0)
            || set.evaluate().1
    }

    pub fn constraint(&self) -> Expression {
        match &self.state {
            BuilderState::Collecting(set) => set.evaluate().0,
            BuilderState::Unsatisfiable => Expression::False,
        }
    }

    fn transition(&mut self, f: impl FnOnce(NodeSet) -> BuilderState) {
        let state = std::mem::replace(&mut self.state, BuilderState::Unsatisfiable);
        self.state = state.then(f);
    }
}

impl NodeSetFilter for NodeSetConstraintBuilder {
    fn limit_to_empty_set(&mut self) {
        self.state = BuilderState::Unsatisfiable;
    }

    fn limit_to(&mut self, node: &Term) {
        self.transition(|set| set.with_fixed_node(node));
    }

    fn limit_to_uris(&mut self) {
        self.transition(|set| set.with_kind(NodeKind::Uri));
    }

    fn limit_to_blank_nodes(&mut self) {
        self.transition(|set| set.with_kind(NodeKind::Blank));
    }

    fn limit_to_literals(&mut self, language: Option<&str>, datatype: Option<&NamedNode>) {
        let kind = NodeKind::Literal {
            language: language.map(str::to_ascii_lowercase),
            datatype: datatype
                .filter(|dt| dt.as_str() != xsd::STRING.as_str())
                .cloned(),
        };
        self.transition(|set| set.with_kind(kind));
    }

    fn limit_values(&mut self, value: &str) {
        self.transition(|set| set.with_constant(value));
    }

    fn limit_values_to_attribute(&mut self, attribute: &Attribute) {
        self.transition(|set| set.with_attribute(attribute));
    }

    fn limit_values_to_pattern(&mut self, pattern: &Pattern) {
        self.transition(|set| set.with_pattern(pattern));
    }

    fn limit_values_to_blank_node_id(&mut self, id: &BlankNodeId) {
        self.transition(|set| set.with_blank_node_id(id));
    }

    fn limit_values_to_expression(&mut self, expression: &Expression) {
        self.transition(|set| set.with_expression(expression));
    }

    fn set_uses_translator(&mut self, translator: &TranslatorRef) {
        self.describing_uses_translator = true;
        self.transition(|set| set.with_translator(translator));
    }
}
