//! The kind of node a [`super::NodeMaker`] builds from a value.

use std::fmt;
use std::str::FromStr;

use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode, NamedNodeRef, Term};

use super::node_set_filter::NodeSetFilter;
use crate::values::ValueError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Uri,
    Blank,
    PlainLiteral,
    /// Lower-cased, validated language tag.
    LanguageLiteral(String),
    /// Any datatype without a dedicated variant.
    TypedLiteral(NamedNode),
    Date,
    Time,
    DateTime,
    Boolean,
}

impl NodeType {
    pub fn language_literal(tag: &str) -> Result<Self, ValueError> {
        let tag = tag.to_ascii_lowercase();
        Literal::new_language_tagged_literal("", tag.as_str())
            .map_err(|_| ValueError::InvalidLanguageTag { tag: tag.clone() })?;
        Ok(NodeType::LanguageLiteral(tag))
    }

    /// Picks the strict variant for the datatypes that have one.
    pub fn typed_literal(datatype: NamedNode) -> Self {
        let dt = datatype.as_ref();
        if dt == xsd::DATE {
            NodeType::Date
        } else if dt == xsd::TIME {
            NodeType::Time
        } else if dt == xsd::DATE_TIME {
            NodeType::DateTime
        } else if dt == xsd::BOOLEAN {
            NodeType::Boolean
        } else if dt == xsd::STRING {
            NodeType::PlainLiteral
        } else {
            NodeType::TypedLiteral(datatype)
        }
    }

    pub fn is_literal(&self) -> bool {
        !matches!(self, NodeType::Uri | NodeType::Blank)
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            NodeType::LanguageLiteral(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<NamedNodeRef<'_>> {
        match self {
            NodeType::TypedLiteral(dt) => Some(dt.as_ref()),
            NodeType::Date => Some(xsd::DATE),
            NodeType::Time => Some(xsd::TIME),
            NodeType::DateTime => Some(xsd::DATE_TIME),
            NodeType::Boolean => Some(xsd::BOOLEAN),
            _ => None,
        }
    }

    /// Builds the node for `value`, or `None` when `value` is not a valid
    /// lexical form for this type.
    pub fn make_node(&self, value: &str) -> Option<Term> {
        let term: Term = match self {
            NodeType::Uri => match NamedNode::new(value) {
                Ok(node) => node.into(),
                Err(e) => {
                    log::debug!("NodeType: skipping invalid IRI `{}`: {}", value, e);
                    return None;
                }
            },
            NodeType::Blank => match blank_node(value) {
                Some(node) => node.into(),
                None => {
                    log::debug!("NodeType: skipping empty blank node id");
                    return None;
                }
            },
            NodeType::PlainLiteral => Literal::new_simple_literal(value).into(),
            NodeType::LanguageLiteral(tag) => {
                Literal::new_language_tagged_literal_unchecked(value, tag.as_str()).into()
            }
            NodeType::TypedLiteral(dt) => Literal::new_typed_literal(value, dt.clone()).into(),
            NodeType::Boolean => {
                let canonical = canonical_boolean(value)?;
                Literal::new_typed_literal(canonical, xsd::BOOLEAN).into()
            }
            NodeType::Date | NodeType::Time | NodeType::DateTime => {
                if !self.is_valid_lexical_form(value) {
                    log::debug!("NodeType: skipping invalid {} value `{}`", self, value);
                    return None;
                }
                match self.datatype() {
                    Some(dt) => Literal::new_typed_literal(value, dt).into(),
                    None => return None,
                }
            }
        };
        Some(term)
    }

    fn is_valid_lexical_form(&self, value: &str) -> bool {
        match self {
            NodeType::Date => oxsdatatypes::Date::from_str(value).is_ok(),
            NodeType::Time => oxsdatatypes::Time::from_str(value).is_ok(),
            NodeType::DateTime => oxsdatatypes::DateTime::from_str(value).is_ok(),
            NodeType::Boolean => value == "true" || value == "false",
            _ => true,
        }
    }

    /// The lexical value of `node` if this type could have produced it.
    pub fn extract_value(&self, node: &Term) -> Option<String> {
        match (self, node) {
            (NodeType::Uri, Term::NamedNode(n)) => Some(n.as_str().to_string()),
            (NodeType::Blank, Term::BlankNode(b)) => blank_node_value(b),
            (NodeType::PlainLiteral, Term::Literal(l))
                if l.language().is_none() && l.datatype() == xsd::STRING =>
            {
                Some(l.value().to_string())
            }
            (NodeType::LanguageLiteral(tag), Term::Literal(l))
                if l.language().is_some_and(|lang| lang.eq_ignore_ascii_case(tag)) =>
            {
                Some(l.value().to_string())
            }
            (_, Term::Literal(l)) if l.language().is_none() => {
                let dt = self.datatype()?;
                if l.datatype() != dt || !self.is_valid_lexical_form(l.value()) {
                    return None;
                }
                Some(l.value().to_string())
            }
            _ => None,
        }
    }

    pub fn describe(&self, filter: &mut dyn NodeSetFilter) {
        match self {
            NodeType::Uri => filter.limit_to_uris(),
            NodeType::Blank => filter.limit_to_blank_nodes(),
            NodeType::PlainLiteral => filter.limit_to_literals(None, None),
            NodeType::LanguageLiteral(tag) => filter.limit_to_literals(Some(tag), None),
            _ => {
                let dt = self.datatype().map(NamedNodeRef::into_owned);
                filter.limit_to_literals(None, dt.as_ref());
            }
        }
    }
}

/// The blank node for a mapped value. Values such as `Address@@12@@A` are not
/// valid labels, so the label is the hex form of the value.
pub fn blank_node(value: &str) -> Option<BlankNode> {
    BlankNode::new(hex::encode(value)).ok()
}

/// Inverse of [`blank_node`]; `None` for labels it cannot have produced.
pub fn blank_node_value(node: &BlankNode) -> Option<String> {
    let bytes = hex::decode(node.as_str()).ok()?;
    String::from_utf8(bytes).ok()
}

/// `"0"`/`"1"`/`"false"`/`"true"` to the two canonical boolean forms.
pub fn canonical_boolean(value: &str) -> Option<&'static str> {
    match value {
        "true" | "1" => Some("true"),
        "false" | "0" => Some("false"),
        _ => None,
    }
}

/// The database forms that map onto a canonical boolean value.
pub fn boolean_db_forms(canonical: &str) -> Option<[&'static str; 2]> {
    match canonical {
        "true" => Some(["true", "1"]),
        "false" => Some(["false", "0"]),
        _ => None,
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Uri => write!(f, "URI"),
            NodeType::Blank => write!(f, "Blank"),
            NodeType::PlainLiteral => write!(f, "Literal"),
            NodeType::LanguageLiteral(tag) => write!(f, "Literal@{}", tag),
            NodeType::TypedLiteral(dt) => write!(f, "Literal^^{}", dt),
            NodeType::Date => write!(f, "xsd:date"),
            NodeType::Time => write!(f, "xsd:time"),
            NodeType::DateTime => write!(f, "xsd:dateTime"),
            NodeType::Boolean => write!(f, "xsd:boolean"),
        }
    }
}
