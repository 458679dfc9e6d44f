//! The SQL shape of a mapping rule: which tables, joined how, filtered by
//! what, projecting which columns.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use lazy_static::lazy_static;

use super::alias_map::{AliasMap, ColumnRenamer};
use super::attribute::{Attribute, RelationName};
use super::errors::CompileError;
use super::expression::Expression;
use super::join::Join;
use super::projection::{OrderSpec, ProjectionSpec};

lazy_static! {
    /// Matches no rows.
    pub static ref EMPTY_RELATION: Relation = Relation {
        condition: Expression::False,
        ..Relation::bare()
    };
    /// Matches every row and projects nothing.
    pub static ref TRUE_RELATION: Relation = Relation::bare();
}

/// Identifies the database a relation runs against. Relations on different
/// databases never share a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseId(String);

impl DatabaseId {
    pub fn new(id: impl Into<String>) -> Self {
        DatabaseId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    database: Option<DatabaseId>,
    aliases: AliasMap,
    joins: BTreeSet<Join>,
    condition: Expression,
    soft_attributes: BTreeSet<Attribute>,
    projections: BTreeSet<ProjectionSpec>,
    is_unique: bool,
    order: Vec<OrderSpec>,
    limit: Option<u64>,
    limit_inverse: Option<u64>,
}

impl Relation {
    fn bare() -> Self {
        Relation {
            database: None,
            aliases: AliasMap::default(),
            joins: BTreeSet::new(),
            condition: Expression::True,
            soft_attributes: BTreeSet::new(),
            projections: BTreeSet::new(),
            is_unique: true,
            order: Vec::new(),
            limit: None,
            limit_inverse: None,
        }
    }

    pub fn empty() -> Self {
        EMPTY_RELATION.clone()
    }

    pub fn trivial() -> Self {
        TRUE_RELATION.clone()
    }

    pub fn builder(database: DatabaseId) -> RelationBuilder {
        RelationBuilder::new(database)
    }

    pub fn database(&self) -> Option<&DatabaseId> {
        self.database.as_ref()
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn joins(&self) -> &BTreeSet<Join> {
        &self.joins
    }

    pub fn condition(&self) -> &Expression {
        &self.condition
    }

    pub fn soft_attributes(&self) -> &BTreeSet<Attribute> {
        &self.soft_attributes
    }

    pub fn projections(&self) -> &BTreeSet<ProjectionSpec> {
        &self.projections
    }

    /// Whether the rows of this relation are known to be distinct, so that the
    /// generated statement needs no DISTINCT.
    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn order(&self) -> &[OrderSpec] {
        &self.order
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn limit_inverse(&self) -> Option<u64> {
        self.limit_inverse
    }

    pub fn is_empty(&self) -> bool {
        self.condition.is_false()
    }

    /// No joins, no filter and nothing projected: the relation has exactly one
    /// (empty) row and can be answered without touching the database.
    pub fn is_trivial(&self) -> bool {
        self.joins.is_empty() && self.condition.is_true() && self.projections.is_empty()
    }

    /// Every attribute read by projections, joins, the condition or the order.
    pub fn attributes(&self) -> BTreeSet<Attribute> {
        let mut out = self.condition.attributes();
        for projection in &self.projections {
            out.extend(projection.attributes());
        }
        for join in &self.joins {
            out.extend(join.attributes().cloned());
        }
        for order in &self.order {
            out.extend(order.expression().attributes());
        }
        out
    }

    /// Every (possibly aliased) table the relation touches.
    pub fn relation_names(&self) -> BTreeSet<RelationName> {
        self.attributes()
            .into_iter()
            .map(|a| a.relation_name().clone())
            .collect()
    }

    /// Tables whose every referenced attribute is soft. They are outer-joined
    /// so that missing rows only null out the optional values.
    pub fn optional_relation_names(&self) -> BTreeSet<RelationName> {
        let mandatory: BTreeSet<RelationName> = self
            .projections
            .iter()
            .flat_map(|p| p.attributes())
            .chain(self.condition.attributes())
            .filter(|a| !self.soft_attributes.contains(a))
            .map(|a| a.relation_name().clone())
            .collect();
        self.soft_attributes
            .iter()
            .map(|a| a.relation_name().clone())
            .filter(|name| !mandatory.contains(name))
            .collect()
    }

    /// Adds conditions; collapses to [`EMPTY_RELATION`] when they cannot hold.
    pub fn select(&self, conditions: impl IntoIterator<Item = Expression>) -> Relation {
        let condition = Expression::conjunction(
            std::iter::once(self.condition.clone()).chain(conditions),
        );
        if condition.is_false() {
            return Relation::empty();
        }
        Relation {
            condition,
            ..self.clone()
        }
    }

    pub fn with_projections(&self, projections: BTreeSet<ProjectionSpec>) -> Relation {
        Relation {
            projections,
            ..self.clone()
        }
    }

    pub fn with_limit(&self, limit: Option<u64>) -> Relation {
        Relation {
            limit: min_limit(self.limit, limit),
            ..self.clone()
        }
    }

    pub fn with_condition(&self, condition: Expression) -> Relation {
        if condition.is_false() {
            return Relation::empty();
        }
        Relation {
            condition,
            ..self.clone()
        }
    }

    pub fn without_join(&self, join: &Join) -> Relation {
        let mut joins = self.joins.clone();
        joins.remove(join);
        Relation {
            joins,
            ..self.clone()
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Relation {
        if self.is_empty() {
            return self.clone();
        }
        Relation {
            database: self.database.clone(),
            aliases: renamer.apply_to_alias_map(&self.aliases),
            joins: self.joins.iter().map(|j| j.rename(renamer)).collect(),
            condition: self.condition.rename(renamer),
            soft_attributes: self
                .soft_attributes
                .iter()
                .map(|a| renamer.apply_to_attribute(a))
                .collect(),
            projections: self.projections.iter().map(|p| p.rename(renamer)).collect(),
            is_unique: self.is_unique,
            order: self.order.iter().map(|o| o.rename(renamer)).collect(),
            limit: self.limit,
            limit_inverse: self.limit_inverse,
        }
    }

    /// The conjunction of several relations: all joins, all conditions, all
    /// projections. Used to join mapping rules that share a node.
    pub fn combine(relations: &[Relation]) -> Result<Relation, CompileError> {
        let mut combined = Relation::bare();
        for relation in relations {
            if relation.is_empty() {
                return Ok(Relation::empty());
            }
            match (&combined.database, &relation.database) {
                (Some(left), Some(right)) if left != right => {
                    return Err(CompileError::CrossDatabaseJoin {
                        left: left.to_string(),
                        right: right.to_string(),
                    });
                }
                (None, Some(right)) => combined.database = Some(right.clone()),
                _ => {}
            }
            combined.aliases = combined.aliases.union(&relation.aliases);
            combined.joins.extend(relation.joins.iter().cloned());
            combined.condition = combined.condition.and(&relation.condition);
            combined
                .soft_attributes
                .extend(relation.soft_attributes.iter().cloned());
            combined
                .projections
                .extend(relation.projections.iter().cloned());
            combined.is_unique &= relation.is_unique;
            combined.order.extend(relation.order.iter().cloned());
            combined.limit = min_limit(combined.limit, relation.limit);
            combined.limit_inverse = min_limit(combined.limit_inverse, relation.limit_inverse);
        }
        if combined.condition.is_false() {
            return Ok(Relation::empty());
        }
        Ok(combined)
    }

    pub fn with_joins(&self, joins: impl IntoIterator<Item = Join>) -> Relation {
        let mut all = self.joins.clone();
        all.extend(joins);
        Relation {
            joins: all,
            ..self.clone()
        }
    }

    pub(crate) fn with_unique(&self, is_unique: bool) -> Relation {
        Relation {
            is_unique,
            ..self.clone()
        }
    }
}

fn min_limit(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Relation(EMPTY)");
        }
        let projections: Vec<String> = self.projections.iter().map(|p| p.to_string()).collect();
        write!(f, "Relation(project [{}]", projections.join(", "))?;
        if !self.aliases.is_empty() {
            write!(f, " aliases {}", self.aliases)?;
        }
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        if !self.condition.is_true() {
            write!(f, " where {}", self.condition)?;
        }
        if !self.is_unique {
            write!(f, " distinct")?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        write!(f, ")")
    }
}

/// Accumulates the parts of a [`Relation`] and validates them on `build`.
#[derive(Debug, Clone)]
pub struct RelationBuilder {
    relation: Relation,
}

impl RelationBuilder {
    pub fn new(database: DatabaseId) -> Self {
        RelationBuilder {
            relation: Relation {
                database: Some(database),
                is_unique: false,
                ..Relation::bare()
            },
        }
    }

    pub fn alias(mut self, original: RelationName, alias: RelationName) -> Self {
        self.relation.aliases = self
            .relation
            .aliases
            .union(&AliasMap::single(original, alias));
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.relation.joins.insert(join);
        self
    }

    pub fn condition(mut self, condition: Expression) -> Self {
        self.relation.condition = self.relation.condition.and(&condition);
        self
    }

    pub fn soft_attribute(mut self, attribute: Attribute) -> Self {
        self.relation.soft_attributes.insert(attribute);
        self
    }

    pub fn project(mut self, projection: ProjectionSpec) -> Self {
        self.relation.projections.insert(projection);
        self
    }

    pub fn project_all(mut self, projections: impl IntoIterator<Item = ProjectionSpec>) -> Self {
        self.relation.projections.extend(projections);
        self
    }

    pub fn unique(mut self, is_unique: bool) -> Self {
        self.relation.is_unique = is_unique;
        self
    }

    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.relation.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.relation.limit = Some(limit);
        self
    }

    pub fn limit_inverse(mut self, limit: u64) -> Self {
        self.relation.limit_inverse = Some(limit);
        self
    }

    /// Finishes the relation. Fails if the referenced tables do not form one
    /// connected join graph.
    pub fn build(self) -> Result<Relation, CompileError> {
        let relation = self.relation;
        if relation.condition.is_false() {
            return Ok(Relation::empty());
        }
        check_connected(&relation)?;
        Ok(relation)
    }
}

/// Every table must be reachable from every other one through joins or
/// attribute equalities in the condition.
pub(crate) fn check_connected(relation: &Relation) -> Result<(), CompileError> {
    let names = relation.relation_names();
    if names.len() <= 1 {
        return Ok(());
    }
    let mut edges: BTreeMap<RelationName, BTreeSet<RelationName>> = BTreeMap::new();
    let mut link = |a: &RelationName, b: &RelationName| {
        edges.entry(a.clone()).or_default().insert(b.clone());
        edges.entry(b.clone()).or_default().insert(a.clone());
    };
    for join in &relation.joins {
        link(join.table1(), join.table2());
    }
    let equalities: Vec<&Expression> = match &relation.condition {
        Expression::Conjunction(parts) => parts.iter().collect(),
        other => vec![other],
    };
    for part in equalities {
        if let Expression::Equality(l, r) = part {
            if let (Expression::Attribute(a), Expression::Attribute(b)) = (l.as_ref(), r.as_ref()) {
                link(a.relation_name(), b.relation_name());
            }
        }
    }

    let mut seen: BTreeSet<RelationName> = BTreeSet::new();
    let mut queue: VecDeque<RelationName> = names.iter().take(1).cloned().collect();
    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(next) = edges.get(&name) {
            queue.extend(next.iter().filter(|n| !seen.contains(*n)).cloned());
        }
    }
    if names.iter().all(|n| seen.contains(n)) {
        Ok(())
    } else {
        Err(CompileError::DisconnectedJoinGraph {
            bridge: String::new(),
            relations: names
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}
