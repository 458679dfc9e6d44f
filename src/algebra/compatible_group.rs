//! Grouping of relations that can be answered by a single SELECT.

use std::collections::BTreeSet;

use super::expression::Expression;
use super::projection::ProjectionSpec;
use super::relation::Relation;

#[derive(Debug, Clone)]
struct Member<T> {
    condition: Expression,
    projections: BTreeSet<ProjectionSpec>,
    payload: T,
}

/// Relations that share their tables, joins, aliases, uniqueness, ordering and
/// limits, and so can be merged into one statement.
///
/// Members that differ only in their condition are merged with an OR'd
/// condition. Each such member then gets a discriminator column telling
/// whether its own condition held for a row.
#[derive(Debug, Clone)]
pub struct CompatibleRelationGroup<T> {
    template: Relation,
    members: Vec<Member<T>>,
}

/// A merged group: the relation to execute and, per member, the payload and
/// the discriminator projection to check (if any).
#[derive(Debug, Clone)]
pub struct MergedGroup<T> {
    pub relation: Relation,
    pub members: Vec<(T, Option<ProjectionSpec>)>,
}

impl<T> CompatibleRelationGroup<T> {
    pub fn new(relation: &Relation, payload: T) -> Self {
        CompatibleRelationGroup {
            template: relation.clone(),
            members: vec![Member {
                condition: relation.condition().clone(),
                projections: relation.projections().clone(),
                payload,
            }],
        }
    }

    /// Splits `items` into groups; order of first appearance is kept.
    pub fn group(items: Vec<(Relation, T)>) -> Vec<CompatibleRelationGroup<T>> {
        let mut groups: Vec<CompatibleRelationGroup<T>> = Vec::new();
        for (relation, payload) in items {
            match groups.iter_mut().find(|g| g.is_compatible(&relation)) {
                Some(group) => group.add(&relation, payload),
                None => groups.push(CompatibleRelationGroup::new(&relation, payload)),
            }
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_compatible(&self, other: &Relation) -> bool {
        let first = &self.template;
        if first.is_empty() || other.is_empty() || first.is_trivial() || other.is_trivial() {
            return false;
        }
        let same_shape = first.database() == other.database()
            && first.aliases() == other.aliases()
            && first.joins() == other.joins()
            && first.soft_attributes() == other.soft_attributes()
            && first.is_unique() == other.is_unique()
            && first.order() == other.order()
            && first.limit() == other.limit()
            && first.limit_inverse() == other.limit_inverse();
        if !same_shape {
            return false;
        }
        let same_condition = self
            .members
            .iter()
            .all(|m| &m.condition == other.condition());
        // A limit counts rows of the merged statement, and DISTINCT over a
        // wider column set yields extra rows, so both need an exact match.
        if first.limit().is_some() || first.limit_inverse().is_some() {
            return same_condition;
        }
        if !first.is_unique() {
            return same_condition
                && self
                    .members
                    .iter()
                    .all(|m| &m.projections == other.projections());
        }
        true
    }

    pub fn add(&mut self, relation: &Relation, payload: T) {
        self.members.push(Member {
            condition: relation.condition().clone(),
            projections: relation.projections().clone(),
            payload,
        });
    }

    pub fn merge(self) -> MergedGroup<T> {
        let all_same = self
            .members
            .iter()
            .all(|m| m.condition == self.members[0].condition);
        let mut projections: BTreeSet<ProjectionSpec> = BTreeSet::new();
        let mut members = Vec::with_capacity(self.members.len());
        let mut conditions = Vec::with_capacity(self.members.len());
        for member in self.members {
            projections.extend(member.projections.iter().cloned());
            let discriminator = if all_same || member.condition.is_true() {
                None
            } else {
                let spec = ProjectionSpec::Condition(member.condition.clone());
                projections.insert(spec.clone());
                Some(spec)
            };
            conditions.push(member.condition);
            members.push((member.payload, discriminator));
        }
        let condition = if all_same {
            conditions.swap_remove(0)
        } else {
            Expression::disjunction(conditions)
        };
        let relation = self
            .template
            .with_condition(condition)
            .with_projections(projections);
        MergedGroup { relation, members }
    }
}
