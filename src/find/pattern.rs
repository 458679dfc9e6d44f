//! Triple patterns: what a lookup asks for.

use std::collections::BTreeMap;
use std::fmt;

use oxrdf::{Subject, Term, Triple};

/// One position of a [`TriplePattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternNode {
    Concrete(Term),
    /// Named variable; repeated names must bind the same node.
    Variable(String),
    /// Wildcard.
    Any,
}

impl PatternNode {
    pub fn concrete(term: impl Into<Term>) -> Self {
        PatternNode::Concrete(term.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        PatternNode::Variable(name.into())
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, PatternNode::Concrete(_))
    }

    pub fn variable_name(&self) -> Option<&str> {
        match self {
            PatternNode::Variable(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternNode::Concrete(t) => write!(f, "{}", t),
            PatternNode::Variable(name) => write!(f, "?{}", name),
            PatternNode::Any => write!(f, "ANY"),
        }
    }
}

/// Node assignments for the variables of one or more patterns.
pub type Bindings = BTreeMap<String, Term>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: PatternNode,
    pub predicate: PatternNode,
    pub object: PatternNode,
}

impl TriplePattern {
    pub fn new(subject: PatternNode, predicate: PatternNode, object: PatternNode) -> Self {
        TriplePattern {
            subject,
            predicate,
            object,
        }
    }

    /// `(ANY, ANY, ANY)`.
    pub fn any() -> Self {
        TriplePattern::new(PatternNode::Any, PatternNode::Any, PatternNode::Any)
    }

    pub fn positions(&self) -> [&PatternNode; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Variables with every position they occur in (0 = subject).
    pub fn variables(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut out: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, node) in self.positions().into_iter().enumerate() {
            if let Some(name) = node.variable_name() {
                out.entry(name).or_default().push(i);
            }
        }
        out
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        self.bind(triple, &Bindings::new()).is_some()
    }

    /// Extends `bindings` with the variables of this pattern bound against
    /// `triple`, or `None` when the triple does not match.
    pub fn bind(&self, triple: &Triple, bindings: &Bindings) -> Option<Bindings> {
        let terms = [
            Term::from(triple.subject.clone()),
            Term::from(triple.predicate.clone()),
            triple.object.clone(),
        ];
        let mut out = bindings.clone();
        for (node, term) in self.positions().into_iter().zip(terms) {
            match node {
                PatternNode::Any => {}
                PatternNode::Concrete(expected) => {
                    if expected != &term {
                        return None;
                    }
                }
                PatternNode::Variable(name) => match out.get(name) {
                    Some(bound) if bound != &term => return None,
                    Some(_) => {}
                    None => {
                        out.insert(name.clone(), term);
                    }
                },
            }
        }
        Some(out)
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// Assembles a triple from three produced terms. Literal subjects and
/// non-IRI predicates cannot form a triple.
pub fn make_triple(subject: Term, predicate: Term, object: Term) -> Option<Triple> {
    let subject = match subject {
        Term::NamedNode(n) => Subject::NamedNode(n),
        Term::BlankNode(b) => Subject::BlankNode(b),
        other => {
            log::debug!("Skipping triple with non-resource subject {}", other);
            return None;
        }
    };
    let Term::NamedNode(predicate) = predicate else {
        log::debug!("Skipping triple with non-IRI predicate {}", predicate);
        return None;
    };
    Some(Triple::new(subject, predicate, object))
}
