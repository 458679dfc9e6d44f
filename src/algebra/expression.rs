//! Boolean and value expressions used in join conditions, filters and
//! projections.
//!
//! Expressions are kept in a canonical form: conjunctions and disjunctions are
//! flattened, sorted and de-duplicated, equalities order their operands, and
//! constant sub-terms are folded. Two expressions that mean the same thing
//! after these rewrites compare equal and print identically, which is what the
//! relation-merging code relies on.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use super::alias_map::ColumnRenamer;
use super::attribute::Attribute;
use crate::sql::dialect::{ColumnType, SqlContext};

lazy_static! {
    static ref SQL_TOKEN: Regex = Regex::new(
        r"'(?:[^']|'')*'|[A-Za-z_][A-Za-z0-9_$]*(?:\.[A-Za-z_][A-Za-z0-9_$]*){1,2}"
    )
    .expect("static regex");
}

/// A string constant, optionally tied to the attribute it is compared with so
/// that it can be rendered according to that column's type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constant {
    value: String,
    attribute: Option<Attribute>,
}

impl Constant {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attribute(&self) -> Option<&Attribute> {
        self.attribute.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlPart {
    Text(String),
    Attribute(Attribute),
}

/// A raw SQL fragment with the attribute references it mentions recognised,
/// so that the fragment can be renamed along with the rest of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SqlFragment {
    parts: Vec<SqlPart>,
}

impl SqlFragment {
    pub fn parse(sql: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;
        for token in SQL_TOKEN.find_iter(sql) {
            let text = token.as_str();
            if text.starts_with('\'') {
                continue;
            }
            // `1.5e3` style numbers and `x.y` inside longer identifiers are not
            // attribute references.
            let preceded_by_word = sql[..token.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.');
            if preceded_by_word {
                continue;
            }
            let Ok(attribute) = Attribute::parse(text) else {
                continue;
            };
            if token.start() > last {
                parts.push(SqlPart::Text(sql[last..token.start()].to_string()));
            }
            parts.push(SqlPart::Attribute(attribute));
            last = token.end();
        }
        if last < sql.len() {
            parts.push(SqlPart::Text(sql[last..].to_string()));
        }
        SqlFragment { parts }
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.parts.iter().filter_map(|part| match part {
            SqlPart::Attribute(a) => Some(a),
            SqlPart::Text(_) => None,
        })
    }

    fn rename(&self, renamer: &dyn ColumnRenamer) -> Self {
        SqlFragment {
            parts: self
                .parts
                .iter()
                .map(|part| match part {
                    SqlPart::Attribute(a) => SqlPart::Attribute(renamer.apply_to_attribute(a)),
                    SqlPart::Text(t) => SqlPart::Text(t.clone()),
                })
                .collect(),
        }
    }

    fn to_sql(&self, ctx: &SqlContext<'_>) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                SqlPart::Attribute(a) => ctx.dialect.quote_attribute(a),
                SqlPart::Text(t) => t.clone(),
            })
            .collect()
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                SqlPart::Attribute(a) => write!(f, "{}", a)?,
                SqlPart::Text(t) => write!(f, "{}", t)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expression {
    True,
    False,
    Attribute(Attribute),
    Constant(Constant),
    Sql(SqlFragment),
    Equality(Box<Expression>, Box<Expression>),
    /// Sorted, de-duplicated, at least two operands, none of them a conjunction.
    Conjunction(Vec<Expression>),
    /// Sorted, de-duplicated, at least two operands, none of them a disjunction.
    Disjunction(Vec<Expression>),
    /// String concatenation of at least two operands.
    Concatenation(Vec<Expression>),
    NotNull(Attribute),
}

impl Expression {
    pub fn attribute(attribute: Attribute) -> Self {
        Expression::Attribute(attribute)
    }

    pub fn constant(value: impl Into<String>) -> Self {
        Expression::Constant(Constant {
            value: value.into(),
            attribute: None,
        })
    }

    /// A constant that will be rendered according to `attribute`'s column type.
    pub fn typed_constant(value: impl Into<String>, attribute: &Attribute) -> Self {
        Expression::Constant(Constant {
            value: value.into(),
            attribute: Some(attribute.clone()),
        })
    }

    pub fn sql(fragment: &str) -> Self {
        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            return Expression::True;
        }
        Expression::Sql(SqlFragment::parse(trimmed))
    }

    pub fn not_null(attribute: Attribute) -> Self {
        Expression::NotNull(attribute)
    }

    pub fn equality(left: Expression, right: Expression) -> Self {
        if left == right {
            return Expression::True;
        }
        if let (Expression::Constant(l), Expression::Constant(r)) = (&left, &right) {
            return if l.value == r.value {
                Expression::True
            } else {
                Expression::False
            };
        }
        if left.is_false() || right.is_false() {
            return Expression::False;
        }
        if left < right {
            Expression::Equality(Box::new(left), Box::new(right))
        } else {
            Expression::Equality(Box::new(right), Box::new(left))
        }
    }

    pub fn attribute_equality(left: &Attribute, right: &Attribute) -> Self {
        Expression::equality(
            Expression::Attribute(left.clone()),
            Expression::Attribute(right.clone()),
        )
    }

    /// `attribute = 'value'`, with the constant typed by the attribute.
    pub fn attribute_value(attribute: &Attribute, value: &str) -> Self {
        Expression::equality(
            Expression::Attribute(attribute.clone()),
            Expression::typed_constant(value, attribute),
        )
    }

    pub fn conjunction(parts: impl IntoIterator<Item = Expression>) -> Self {
        let mut operands = BTreeSet::new();
        for part in parts {
            match part {
                Expression::True => {}
                Expression::False => return Expression::False,
                Expression::Conjunction(inner) => operands.extend(inner),
                other => {
                    operands.insert(other);
                }
            }
        }
        if has_conflicting_constants(&operands) {
            return Expression::False;
        }
        let mut operands: Vec<Expression> = operands.into_iter().collect();
        match operands.len() {
            0 => Expression::True,
            1 => operands.remove(0),
            _ => Expression::Conjunction(operands),
        }
    }

    pub fn disjunction(parts: impl IntoIterator<Item = Expression>) -> Self {
        let mut operands = BTreeSet::new();
        for part in parts {
            match part {
                Expression::False => {}
                Expression::True => return Expression::True,
                Expression::Disjunction(inner) => operands.extend(inner),
                other => {
                    operands.insert(other);
                }
            }
        }
        let mut operands: Vec<Expression> = operands.into_iter().collect();
        match operands.len() {
            0 => Expression::False,
            1 => operands.remove(0),
            _ => Expression::Disjunction(operands),
        }
    }

    /// Concatenation with adjacent constants folded and empty constants dropped.
    pub fn concatenation(parts: impl IntoIterator<Item = Expression>) -> Self {
        let mut folded: Vec<Expression> = Vec::new();
        for part in parts {
            let part = match part {
                Expression::Concatenation(inner) => {
                    folded.extend(inner);
                    continue;
                }
                other => other,
            };
            if let Expression::Constant(c) = &part {
                if c.value.is_empty() {
                    continue;
                }
                if let Some(Expression::Constant(previous)) = folded.last_mut() {
                    previous.value.push_str(&c.value);
                    previous.attribute = None;
                    continue;
                }
            }
            folded.push(part);
        }
        match folded.len() {
            0 => Expression::constant(""),
            1 => folded.remove(0),
            _ => Expression::Concatenation(folded),
        }
    }

    pub fn and(&self, other: &Expression) -> Expression {
        Expression::conjunction([self.clone(), other.clone()])
    }

    pub fn or(&self, other: &Expression) -> Expression {
        Expression::disjunction([self.clone(), other.clone()])
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expression::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expression::False)
    }

    /// Every attribute the expression reads.
    pub fn attributes(&self) -> BTreeSet<Attribute> {
        let mut out = BTreeSet::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes(&self, out: &mut BTreeSet<Attribute>) {
        match self {
            Expression::True | Expression::False => {}
            Expression::Attribute(a) | Expression::NotNull(a) => {
                out.insert(a.clone());
            }
            // The typing attribute of a constant is not read by the query.
            Expression::Constant(_) => {}
            Expression::Sql(fragment) => out.extend(fragment.attributes().cloned()),
            Expression::Equality(l, r) => {
                l.collect_attributes(out);
                r.collect_attributes(out);
            }
            Expression::Conjunction(parts)
            | Expression::Disjunction(parts)
            | Expression::Concatenation(parts) => {
                for part in parts {
                    part.collect_attributes(out);
                }
            }
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Expression {
        match self {
            Expression::True | Expression::False => self.clone(),
            Expression::Attribute(a) => Expression::Attribute(renamer.apply_to_attribute(a)),
            Expression::NotNull(a) => Expression::NotNull(renamer.apply_to_attribute(a)),
            Expression::Constant(c) => Expression::Constant(Constant {
                value: c.value.clone(),
                attribute: c.attribute.as_ref().map(|a| renamer.apply_to_attribute(a)),
            }),
            Expression::Sql(fragment) => Expression::Sql(fragment.rename(renamer)),
            Expression::Equality(l, r) => {
                Expression::equality(l.rename(renamer), r.rename(renamer))
            }
            Expression::Conjunction(parts) => {
                Expression::conjunction(parts.iter().map(|p| p.rename(renamer)))
            }
            Expression::Disjunction(parts) => {
                Expression::disjunction(parts.iter().map(|p| p.rename(renamer)))
            }
            Expression::Concatenation(parts) => {
                Expression::concatenation(parts.iter().map(|p| p.rename(renamer)))
            }
        }
    }

    /// Renders the expression for execution with the given dialect.
    pub fn to_sql(&self, ctx: &SqlContext<'_>) -> String {
        match self {
            Expression::True => ctx.dialect.true_literal().to_string(),
            Expression::False => ctx.dialect.false_literal().to_string(),
            Expression::Attribute(a) => ctx.dialect.quote_attribute(a),
            Expression::NotNull(a) => format!("{} IS NOT NULL", ctx.dialect.quote_attribute(a)),
            Expression::Constant(c) => {
                render_constant(c, ctx).unwrap_or_else(|| ctx.dialect.quote_string(&c.value))
            }
            Expression::Sql(fragment) => fragment.to_sql(ctx),
            Expression::Equality(l, r) => {
                for side in [l, r] {
                    if let Expression::Constant(c) = side.as_ref() {
                        if render_constant(c, ctx).is_none() {
                            return ctx.dialect.false_literal().to_string();
                        }
                    }
                }
                format!("{} = {}", operand_sql(l, ctx), operand_sql(r, ctx))
            }
            Expression::Conjunction(parts) => parts
                .iter()
                .map(|p| operand_sql(p, ctx))
                .collect::<Vec<_>>()
                .join(" AND "),
            Expression::Disjunction(parts) => parts
                .iter()
                .map(|p| operand_sql(p, ctx))
                .collect::<Vec<_>>()
                .join(" OR "),
            Expression::Concatenation(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.to_sql(ctx)).collect();
                ctx.dialect.concat(&rendered)
            }
        }
    }

    fn needs_parentheses(&self) -> bool {
        matches!(
            self,
            Expression::Conjunction(_) | Expression::Disjunction(_) | Expression::Sql(_)
        )
    }
}

fn operand_sql(expr: &Expression, ctx: &SqlContext<'_>) -> String {
    if expr.needs_parentheses() {
        format!("({})", expr.to_sql(ctx))
    } else {
        expr.to_sql(ctx)
    }
}

/// Renders a constant according to the column type of its attribute.
/// Returns `None` when the value can never be stored in that column.
fn render_constant(constant: &Constant, ctx: &SqlContext<'_>) -> Option<String> {
    let column_type = constant
        .attribute
        .as_ref()
        .map(|a| ctx.column_type(a))
        .unwrap_or(ColumnType::Character);
    match column_type {
        ColumnType::Numeric => {
            let value = constant.value.trim();
            if !value.is_empty() && value.parse::<f64>().is_ok() {
                Some(value.to_string())
            } else {
                None
            }
        }
        ColumnType::Boolean => match constant.value.as_str() {
            "true" | "1" => Some(ctx.dialect.boolean_literal(true)),
            "false" | "0" => Some(ctx.dialect.boolean_literal(false)),
            _ => None,
        },
        ColumnType::Character | ColumnType::Date | ColumnType::Timestamp | ColumnType::Other => {
            Some(ctx.dialect.quote_string(&constant.value))
        }
    }
}

/// Constant propagation over attribute equality classes: two different
/// constants reachable through `=` make a conjunction unsatisfiable.
fn has_conflicting_constants(operands: &BTreeSet<Expression>) -> bool {
    let mut parent: BTreeMap<Attribute, Attribute> = BTreeMap::new();
    fn find(parent: &BTreeMap<Attribute, Attribute>, a: &Attribute) -> Attribute {
        let mut root = a.clone();
        while let Some(next) = parent.get(&root) {
            if *next == root {
                break;
            }
            root = next.clone();
        }
        root
    }

    let mut bindings: Vec<(&Attribute, &str)> = Vec::new();
    for operand in operands {
        let Expression::Equality(l, r) = operand else {
            continue;
        };
        match (l.as_ref(), r.as_ref()) {
            (Expression::Attribute(a), Expression::Attribute(b)) => {
                let ra = find(&parent, a);
                let rb = find(&parent, b);
                if ra != rb {
                    parent.insert(ra, rb);
                }
            }
            (Expression::Attribute(a), Expression::Constant(c))
            | (Expression::Constant(c), Expression::Attribute(a)) => {
                bindings.push((a, c.value()));
            }
            _ => {}
        }
    }
    if bindings.len() < 2 {
        return false;
    }
    let mut seen: BTreeMap<Attribute, &str> = BTreeMap::new();
    for (attribute, value) in bindings {
        let root = find(&parent, attribute);
        match seen.get(&root) {
            Some(previous) if *previous != value => return true,
            Some(_) => {}
            None => {
                seen.insert(root, value);
            }
        }
    }
    false
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, e: &Expression) -> fmt::Result {
            if e.needs_parentheses() {
                write!(f, "({})", e)
            } else {
                write!(f, "{}", e)
            }
        }
        fn joined(f: &mut fmt::Formatter<'_>, parts: &[Expression], sep: &str) -> fmt::Result {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, "{}", sep)?;
                }
                operand(f, part)?;
            }
            Ok(())
        }

        match self {
            Expression::True => write!(f, "TRUE"),
            Expression::False => write!(f, "FALSE"),
            Expression::Attribute(a) => write!(f, "{}", a),
            Expression::NotNull(a) => write!(f, "{} IS NOT NULL", a),
            Expression::Constant(c) => write!(f, "'{}'", c.value.replace('\'', "''")),
            Expression::Sql(fragment) => write!(f, "{}", fragment),
            Expression::Equality(l, r) => {
                operand(f, l)?;
                write!(f, " = ")?;
                operand(f, r)
            }
            Expression::Conjunction(parts) => joined(f, parts, " AND "),
            Expression::Disjunction(parts) => joined(f, parts, " OR "),
            Expression::Concatenation(parts) => joined(f, parts, " || "),
        }
    }
}
