//! Removes joins that only serve to reach a key column already available on
//! the referencing side of a foreign key.
//!
//! For `papers.author => authors.id`, if `authors` is touched through
//! `authors.id` alone, every use of `authors.id` can read `papers.author`
//! instead and the join reduces to `papers.author IS NOT NULL`.

use std::collections::{BTreeMap, BTreeSet};

use super::alias_map::{ColumnRenamer, ColumnRenamerMap};
use super::attribute::{Attribute, RelationName};
use super::expression::Expression;
use super::join::Join;
use super::relation::Relation;

/// Result of optimizing a relation: the simplified relation plus the
/// substitutions that must also be applied to anything that reads from it.
#[derive(Debug, Clone)]
pub struct OptimizedRelation {
    pub relation: Relation,
    pub renamer: ColumnRenamerMap,
}

pub struct JoinOptimizer;

impl JoinOptimizer {
    pub fn optimize(relation: &Relation) -> OptimizedRelation {
        let mut current = relation.clone();
        let mut replacements: BTreeMap<Attribute, Attribute> = BTreeMap::new();
        while let Some((join, step)) = find_removable_join(&current) {
            log::debug!("JoinOptimizer: removing {}", join);
            let renamer = ColumnRenamerMap::new(step.clone());
            let not_null = fk_side(&join)
                .iter()
                .map(|a| Expression::not_null(a.clone()))
                .collect::<Vec<_>>();
            current = current
                .without_join(&join)
                .rename(&renamer)
                .select(not_null);
            for value in replacements.values_mut() {
                *value = renamer.apply_to_attribute(value);
            }
            for (from, to) in step {
                replacements.entry(from).or_insert(to);
            }
        }
        OptimizedRelation {
            relation: current,
            renamer: ColumnRenamerMap::new(replacements),
        }
    }
}

/// The attributes on the referencing side of a directed join.
fn fk_side(join: &Join) -> Vec<Attribute> {
    match join.referenced_table() {
        Some(t) if t == join.table1() => join.attributes2().to_vec(),
        Some(_) => join.attributes1().to_vec(),
        None => Vec::new(),
    }
}

fn find_removable_join(relation: &Relation) -> Option<(Join, BTreeMap<Attribute, Attribute>)> {
    if relation.is_empty() {
        return None;
    }
    let optional = relation.optional_relation_names();
    for join in relation.joins() {
        let Some(referenced) = join.referenced_table() else {
            continue;
        };
        if optional.contains(referenced) {
            continue;
        }
        let Some(referencing) = join.other_table(referenced) else {
            continue;
        };
        if optional.contains(referencing) {
            continue;
        }
        if relation
            .joins()
            .iter()
            .any(|other| other != join && other.contains_relation(referenced))
        {
            continue;
        }
        let key_columns: BTreeSet<&Attribute> = join
            .attributes()
            .filter(|a| a.relation_name() == referenced)
            .collect();
        if uses_of(relation, referenced)
            .iter()
            .all(|a| key_columns.contains(a))
        {
            let replacements = key_columns
                .iter()
                .filter_map(|key| {
                    join.equal_attribute(key)
                        .map(|fk| ((*key).clone(), fk.clone()))
                })
                .collect();
            return Some((join.clone(), replacements));
        }
    }
    None
}

/// Attributes of `table` read anywhere except through joins.
fn uses_of(relation: &Relation, table: &RelationName) -> BTreeSet<Attribute> {
    let mut used = relation.condition().attributes();
    for projection in relation.projections() {
        used.extend(projection.attributes());
    }
    for order in relation.order() {
        used.extend(order.expression().attributes());
    }
    used.extend(relation.soft_attributes().iter().cloned());
    used.into_iter()
        .filter(|a| a.relation_name() == table)
        .collect()
}
