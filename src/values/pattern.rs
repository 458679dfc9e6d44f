//! String templates such as `http://example.org/paper/@@papers.id@@`.
//!
//! Literal fragments alternate with column references delimited by `@@`. A
//! column reference may name a function (`@@papers.title|urlify@@`) that is
//! applied to the column value when rendering and undone when a concrete
//! value is decomposed back into per-column constraints.

use std::fmt;
use std::hash::{Hash, Hasher};

use percent_encoding::{
    percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC,
};
use regex::Regex;

use super::errors::ValueError;
use crate::algebra::alias_map::ColumnRenamer;
use crate::algebra::attribute::Attribute;
use crate::algebra::expression::Expression;
use crate::algebra::projection::{OrderSpec, ProjectionSpec};
use crate::sql::connection::ResultRow;

pub const DELIMITER: &str = "@@";

/// `application/x-www-form-urlencoded` keeps these unescaped.
const FORM_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*');

/// Reserved and unsafe characters in IRIs.
const IRI_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A reversible function applied to a column value inside a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFunction {
    Identity,
    /// Form encoding: space becomes `+`, other unsafe bytes `%XX`.
    UrlEncode,
    /// Spaces become `_`, then form encoding.
    Urlify,
    /// IRI-safe percent encoding of reserved characters.
    Encode,
}

impl ColumnFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "urlencode" => Some(ColumnFunction::UrlEncode),
            "urlify" => Some(ColumnFunction::Urlify),
            "encode" => Some(ColumnFunction::Encode),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        match self {
            ColumnFunction::Identity => None,
            ColumnFunction::UrlEncode => Some("urlencode"),
            ColumnFunction::Urlify => Some("urlify"),
            ColumnFunction::Encode => Some("encode"),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ColumnFunction::Identity)
    }

    pub fn encode(&self, value: &str) -> String {
        match self {
            ColumnFunction::Identity => value.to_string(),
            ColumnFunction::UrlEncode => form_encode(value),
            ColumnFunction::Urlify => form_encode(&value.replace(' ', "_")),
            ColumnFunction::Encode => utf8_percent_encode(value, IRI_ENCODE).to_string(),
        }
    }

    /// `None` when `value` is not a valid encoding.
    pub fn decode(&self, value: &str) -> Option<String> {
        match self {
            ColumnFunction::Identity => Some(value.to_string()),
            ColumnFunction::UrlEncode => form_decode(value),
            ColumnFunction::Urlify => form_decode(value).map(|v| v.replace('_', " ")),
            ColumnFunction::Encode => percent_decode_str(value)
                .decode_utf8()
                .ok()
                .map(|v| v.into_owned()),
        }
    }
}

fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_ENCODE)
        .to_string()
        .replace("%20", "+")
}

fn form_decode(value: &str) -> Option<String> {
    percent_decode_str(&value.replace('+', " "))
        .decode_utf8()
        .ok()
        .map(|v| v.into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternColumn {
    pub attribute: Attribute,
    pub function: ColumnFunction,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    /// Always one more than `columns`.
    literal_parts: Vec<String>,
    columns: Vec<PatternColumn>,
    matcher: Regex,
}

impl Pattern {
    pub fn parse(pattern: &str) -> Result<Self, ValueError> {
        let pieces: Vec<&str> = pattern.split(DELIMITER).collect();
        if pieces.len() % 2 == 0 {
            return Err(ValueError::invalid_pattern(
                pattern,
                format!("unbalanced `{}` delimiters", DELIMITER),
            ));
        }
        let mut literal_parts = Vec::with_capacity(pieces.len() / 2 + 1);
        let mut columns = Vec::with_capacity(pieces.len() / 2);
        for (i, piece) in pieces.iter().enumerate() {
            if i % 2 == 0 {
                literal_parts.push(piece.to_string());
                continue;
            }
            let (reference, function) = match piece.split_once('|') {
                Some((reference, name)) => {
                    let function = ColumnFunction::from_name(name.trim()).ok_or_else(|| {
                        ValueError::invalid_pattern(pattern, format!("unknown function `{}`", name))
                    })?;
                    (reference, function)
                }
                None => (*piece, ColumnFunction::Identity),
            };
            let attribute = Attribute::parse(reference.trim())
                .map_err(|e| ValueError::invalid_pattern(pattern, e.to_string()))?;
            columns.push(PatternColumn {
                attribute,
                function,
            });
        }
        Pattern::from_parts(literal_parts, columns)
    }

    pub fn from_parts(
        literal_parts: Vec<String>,
        columns: Vec<PatternColumn>,
    ) -> Result<Self, ValueError> {
        let display = render_pattern(&literal_parts, &columns);
        if literal_parts.len() != columns.len() + 1 {
            return Err(ValueError::invalid_pattern(
                &display,
                "literal parts and columns do not alternate",
            ));
        }
        let mut regex = String::from("(?s)^");
        for (i, literal) in literal_parts.iter().enumerate() {
            if i > 0 {
                regex.push_str("(.*?)");
            }
            regex.push_str(&regex::escape(literal));
        }
        regex.push('$');
        let matcher = Regex::new(&regex).map_err(|e| ValueError::InvalidRegex {
            regex,
            detail: e.to_string(),
        })?;
        Ok(Pattern {
            literal_parts,
            columns,
            matcher,
        })
    }

    pub fn literal_parts(&self) -> &[String] {
        &self.literal_parts
    }

    pub fn columns(&self) -> &[PatternColumn] {
        &self.columns
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.columns.iter().map(|c| &c.attribute)
    }

    pub fn first_literal_part(&self) -> &str {
        &self.literal_parts[0]
    }

    pub fn last_literal_part(&self) -> &str {
        &self.literal_parts[self.literal_parts.len() - 1]
    }

    pub fn uses_column_functions(&self) -> bool {
        self.columns.iter().any(|c| !c.function.is_identity())
    }

    /// Same literal parts and functions; the columns may differ.
    pub fn is_equivalent_to(&self, other: &Pattern) -> bool {
        self.literal_parts == other.literal_parts
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.function == b.function)
    }

    /// Column-by-column equalities with an equivalent pattern.
    pub fn attribute_equalities(&self, other: &Pattern) -> Expression {
        Expression::conjunction(
            self.columns
                .iter()
                .zip(other.columns.iter())
                .map(|(a, b)| Expression::attribute_equality(&a.attribute, &b.attribute)),
        )
    }

    pub fn make_value(&self, row: &ResultRow) -> Option<String> {
        let mut out = self.literal_parts[0].clone();
        for (column, literal) in self.columns.iter().zip(self.literal_parts[1..].iter()) {
            let value = row.get_attribute(&column.attribute)?;
            out.push_str(&column.function.encode(value));
            out.push_str(literal);
        }
        Some(out)
    }

    /// The condition under which this pattern renders exactly `value`.
    pub fn value_expression(&self, value: &str) -> Expression {
        let Some(captures) = self.matcher.captures(value) else {
            return Expression::False;
        };
        let mut conditions = Vec::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            let part = captures.get(i + 1).map(|m| m.as_str()).unwrap_or("");
            let Some(decoded) = column.function.decode(part) else {
                return Expression::False;
            };
            // A part that does not re-encode to itself was not produced by
            // this pattern.
            if column.function.encode(&decoded) != part {
                return Expression::False;
            }
            conditions.push(Expression::attribute_value(&column.attribute, &decoded));
        }
        Expression::conjunction(conditions)
    }

    /// The pattern as a SQL string concatenation. Column functions cannot be
    /// expressed in SQL; check [`Pattern::uses_column_functions`] first.
    pub fn to_expression(&self) -> Expression {
        let mut parts = Vec::with_capacity(self.literal_parts.len() + self.columns.len());
        parts.push(Expression::constant(self.literal_parts[0].clone()));
        for (column, literal) in self.columns.iter().zip(self.literal_parts[1..].iter()) {
            parts.push(Expression::attribute(column.attribute.clone()));
            parts.push(Expression::constant(literal.clone()));
        }
        Expression::concatenation(parts)
    }

    pub fn projection_specs(&self) -> impl Iterator<Item = ProjectionSpec> + '_ {
        self.attributes().cloned().map(ProjectionSpec::Attribute)
    }

    pub fn order_specs(&self, ascending: bool) -> Vec<OrderSpec> {
        self.attributes()
            .map(|a| {
                let e = Expression::attribute(a.clone());
                if ascending {
                    OrderSpec::ascending(e)
                } else {
                    OrderSpec::descending(e)
                }
            })
            .collect()
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Pattern {
        Pattern {
            literal_parts: self.literal_parts.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| PatternColumn {
                    attribute: renamer.apply_to_attribute(&c.attribute),
                    function: c.function,
                })
                .collect(),
            matcher: self.matcher.clone(),
        }
    }
}

fn render_pattern(literal_parts: &[String], columns: &[PatternColumn]) -> String {
    let mut out = String::new();
    for (i, literal) in literal_parts.iter().enumerate() {
        if i > 0 {
            if let Some(column) = columns.get(i - 1) {
                out.push_str(DELIMITER);
                out.push_str(&column.attribute.to_string());
                if let Some(name) = column.function.name() {
                    out.push('|');
                    out.push_str(name);
                }
                out.push_str(DELIMITER);
            }
        }
        out.push_str(literal);
    }
    out
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.literal_parts == other.literal_parts && self.columns == other.columns
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.literal_parts.hash(state);
        self.columns.hash(state);
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_pattern(&self.literal_parts, &self.columns))
    }
}
