use rdbgraph::algebra::{AliasMap, Attribute, ColumnRenamer, RelationName};
use test_case::test_case;

fn aliases() -> AliasMap {
    AliasMap::from_pairs([
        (
            RelationName::new(None, "papers"),
            RelationName::new(None, "T2_papers"),
        ),
        (
            RelationName::new(Some("lib"), "authors"),
            RelationName::new(None, "T3_lib_authors"),
        ),
    ])
}

#[test_case("papers.id", "T2_papers.id" ; "unqualified table")]
#[test_case("papers.cites", "T2_papers.cites" ; "second column of the same table")]
#[test_case("lib.authors.name", "T3_lib_authors.name" ; "schema qualified table")]
fn test_aliased_attribute_round_trips(reference: &str, aliased: &str) {
    let map = aliases();
    let attribute = Attribute::parse(reference).unwrap();
    let renamed = map.apply_to_attr(&attribute);
    assert_eq!(renamed, Attribute::parse(aliased).unwrap());
    assert_eq!(map.original_of_attr(&renamed), attribute);
}

#[test_case("venues.name" ; "table outside the map")]
#[test_case("other.papers.id" ; "same table name in another schema")]
fn test_attribute_outside_domain_is_unchanged(reference: &str) {
    let map = aliases();
    let attribute = Attribute::parse(reference).unwrap();
    assert_eq!(map.apply_to_attr(&attribute), attribute);
    assert_eq!(map.original_of_attr(&attribute), attribute);
}

#[test]
fn test_renamer_applies_aliases() {
    let map = aliases();
    let attribute = Attribute::parse("papers.year").unwrap();
    assert_eq!(
        map.apply_to_attribute(&attribute),
        Attribute::parse("T2_papers.year").unwrap()
    );
}

#[test]
fn test_empty_map_is_identity() {
    let map = AliasMap::empty();
    let attribute = Attribute::parse("papers.id").unwrap();
    assert_eq!(map.apply_to_attr(&attribute), attribute);
    assert_eq!(map.original_of_attr(&attribute), attribute);
    assert!(map.is_empty());
}
