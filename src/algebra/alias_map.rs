use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;

use super::attribute::{Attribute, RelationName};

lazy_static! {
    /// The identity alias map.
    pub static ref NO_ALIASES: AliasMap = AliasMap::default();
}

/// Something that rewrites attribute references.
///
/// Implemented by [`AliasMap`] (table renaming for self-joins) and
/// [`ColumnRenamerMap`] (column substitution after join elimination).
pub trait ColumnRenamer {
    fn apply_to_attribute(&self, attribute: &Attribute) -> Attribute;

    /// Rewrites the alias declarations of a relation being renamed.
    fn apply_to_alias_map(&self, aliases: &AliasMap) -> AliasMap {
        aliases.clone()
    }
}

/// A set of `alias → original` table renamings.
///
/// [`AliasMap::apply_to`] picks the most recently declared alias of an
/// original; maps with one alias per original keep `apply_to` and
/// [`AliasMap::original_of`] inverse to each other.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    by_alias: BTreeMap<RelationName, RelationName>,
    by_original: BTreeMap<RelationName, RelationName>,
}

impl AliasMap {
    pub fn empty() -> Self {
        NO_ALIASES.clone()
    }

    pub fn single(original: RelationName, alias: RelationName) -> Self {
        let mut map = AliasMap::default();
        map.insert(original, alias);
        map
    }

    /// Builds a map from `(original, alias)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (RelationName, RelationName)>) -> Self {
        let mut map = AliasMap::default();
        for (original, alias) in pairs {
            map.insert(original, alias);
        }
        map
    }

    fn insert(&mut self, original: RelationName, alias: RelationName) {
        self.by_original.insert(original.clone(), alias.clone());
        self.by_alias.insert(alias, original);
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    pub fn is_alias(&self, name: &RelationName) -> bool {
        self.by_alias.contains_key(name)
    }

    pub fn has_alias_for(&self, original: &RelationName) -> bool {
        self.by_original.contains_key(original)
    }

    /// `(alias, original)` pairs in alias order.
    pub fn aliases(&self) -> impl Iterator<Item = (&RelationName, &RelationName)> {
        self.by_alias.iter()
    }

    pub fn apply_to(&self, name: &RelationName) -> RelationName {
        self.by_original
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.clone())
    }

    pub fn original_of(&self, name: &RelationName) -> RelationName {
        self.by_alias
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.clone())
    }

    pub fn apply_to_attr(&self, attribute: &Attribute) -> Attribute {
        if self.is_empty() {
            return attribute.clone();
        }
        attribute.with_relation(self.apply_to(attribute.relation_name()))
    }

    pub fn original_of_attr(&self, attribute: &Attribute) -> Attribute {
        if self.is_empty() {
            return attribute.clone();
        }
        attribute.with_relation(self.original_of(attribute.relation_name()))
    }

    /// Union of two maps. Aliases of `other` win for originals present in both.
    pub fn union(&self, other: &AliasMap) -> AliasMap {
        let mut merged = self.clone();
        for (alias, original) in other.aliases() {
            merged.insert(original.clone(), alias.clone());
        }
        merged
    }
}

impl PartialEq for AliasMap {
    fn eq(&self, other: &Self) -> bool {
        self.by_alias == other.by_alias
    }
}

impl Eq for AliasMap {}

impl std::hash::Hash for AliasMap {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.by_alias.hash(state);
    }
}

impl PartialOrd for AliasMap {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AliasMap {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.by_alias.cmp(&other.by_alias)
    }
}

impl ColumnRenamer for AliasMap {
    fn apply_to_attribute(&self, attribute: &Attribute) -> Attribute {
        self.apply_to_attr(attribute)
    }

    fn apply_to_alias_map(&self, aliases: &AliasMap) -> AliasMap {
        let mut renamed = AliasMap::default();
        // Aliases already declared by the relation are renamed again, but
        // still stand for the same physical table.
        for (alias, original) in aliases.aliases() {
            renamed.insert(original.clone(), self.apply_to(alias));
        }
        for (alias, original) in self.aliases() {
            if !aliases.is_alias(original) {
                renamed.insert(original.clone(), alias.clone());
            }
        }
        renamed
    }
}

impl fmt::Display for AliasMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .by_alias
            .iter()
            .map(|(alias, original)| format!("{} AS {}", original, alias))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Explicit attribute substitutions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRenamerMap {
    replacements: BTreeMap<Attribute, Attribute>,
}

impl ColumnRenamerMap {
    pub fn new(replacements: BTreeMap<Attribute, Attribute>) -> Self {
        ColumnRenamerMap { replacements }
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

impl ColumnRenamer for ColumnRenamerMap {
    fn apply_to_attribute(&self, attribute: &Attribute) -> Attribute {
        self.replacements
            .get(attribute)
            .cloned()
            .unwrap_or_else(|| attribute.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(table: &str) -> RelationName {
        RelationName::new(None, table)
    }

    #[test]
    fn test_round_trip_for_aliased_relation() {
        let map = AliasMap::single(name("papers"), name("T2_papers"));
        let attr = Attribute::parse("papers.title").unwrap();
        let aliased = map.apply_to_attr(&attr);
        assert_eq!(aliased.to_string(), "T2_papers.title");
        assert_eq!(map.original_of_attr(&aliased), attr);
    }

    #[test]
    fn test_identity_outside_domain() {
        let map = AliasMap::single(name("papers"), name("T2_papers"));
        let attr = Attribute::parse("authors.name").unwrap();
        assert_eq!(map.apply_to_attr(&attr), attr);
        assert_eq!(map.original_of_attr(&attr), attr);
    }

    #[test]
    fn test_empty_map_is_identity() {
        let attr = Attribute::parse("s.t.c").unwrap();
        assert!(AliasMap::empty().is_empty());
        assert_eq!(AliasMap::empty(), *NO_ALIASES);
        assert_eq!(AliasMap::empty().apply_to_attr(&attr), attr);
    }

    #[test]
    fn test_renaming_a_relation_that_already_has_aliases() {
        // A relation that self-joins papers as `p2` is itself aliased as the
        // second member of a larger join.
        let declared = AliasMap::single(name("papers"), name("p2"));
        let renamer = AliasMap::from_pairs(vec![
            (name("papers"), name("T1_papers")),
            (name("p2"), name("T1_p2")),
        ]);
        let renamed = renamer.apply_to_alias_map(&declared);
        assert_eq!(renamed.original_of(&name("T1_p2")), name("papers"));
        assert_eq!(renamed.original_of(&name("T1_papers")), name("papers"));
    }

    #[test]
    fn test_column_renamer_map() {
        let from = Attribute::parse("authors.id").unwrap();
        let to = Attribute::parse("rel.author_id").unwrap();
        let renamer = ColumnRenamerMap::new([(from.clone(), to.clone())].into_iter().collect());
        assert_eq!(renamer.apply_to_attribute(&from), to);
        let other = Attribute::parse("authors.name").unwrap();
        assert_eq!(renamer.apply_to_attribute(&other), other);
    }
}
