//! Narrowing a node maker to a concrete node accepts exactly the nodes the
//! maker can produce.

use oxrdf::vocab::xsd;
use oxrdf::{Literal, NamedNode, Term};
use rdbgraph::algebra::{Attribute, Expression, ProjectionSpec};
use rdbgraph::nodes::{NodeMaker, NodeType};
use rdbgraph::sql::ResultRow;
use rdbgraph::values::ValueMaker;
use rdbgraph::PatternNode;
use test_case::test_case;

fn attr(s: &str) -> Attribute {
    Attribute::parse(s).unwrap()
}

fn row(pairs: &[(&str, &str)]) -> ResultRow {
    ResultRow::from_pairs(
        pairs
            .iter()
            .map(|(a, v)| (ProjectionSpec::Attribute(attr(a)), Some(v.to_string()))),
    )
}

fn select(maker: &NodeMaker, node: Term) -> (NodeMaker, Vec<Expression>) {
    let mut conditions = Vec::new();
    let selected = maker.select_node(&PatternNode::Concrete(node), &mut conditions);
    (selected, conditions)
}

fn paper_uri() -> NodeMaker {
    NodeMaker::typed(
        NodeType::Uri,
        ValueMaker::pattern("http://ex/paper/@@papers.venue@@/@@papers.id@@").unwrap(),
        true,
    )
}

fn title() -> NodeMaker {
    NodeMaker::typed(
        NodeType::PlainLiteral,
        ValueMaker::column(attr("papers.title")),
        false,
    )
}

#[test_case("icde", "17" ; "short values")]
#[test_case("vldb", "2024-001" ; "value with a dash")]
#[test_case("sigmod", "a.b" ; "value with a dot")]
fn test_pattern_maker_accepts_its_own_nodes(venue: &str, id: &str) {
    let maker = paper_uri();
    let r = row(&[("papers.venue", venue), ("papers.id", id)]);
    let node = maker.make_node(&r).unwrap();
    let (selected, conditions) = select(&maker, node.clone());
    assert_eq!(selected.fixed_node(), Some(&node));
    assert_eq!(
        conditions,
        vec![Expression::conjunction([
            Expression::attribute_value(&attr("papers.venue"), venue),
            Expression::attribute_value(&attr("papers.id"), id),
        ])]
    );
}

#[test_case("http://ex/author/17" ; "different prefix")]
#[test_case("http://ex/paper/17" ; "too few segments")]
#[test_case("https://ex/paper/icde/17" ; "different scheme")]
fn test_pattern_maker_rejects_foreign_uris(uri: &str) {
    let (selected, conditions) = select(&paper_uri(), NamedNode::new(uri).unwrap().into());
    assert!(selected.is_empty());
    assert!(conditions.is_empty());
}

#[test]
fn test_column_maker_accepts_its_own_nodes() {
    let maker = title();
    let node = maker.make_node(&row(&[("papers.title", "Graphs")])).unwrap();
    let (selected, conditions) = select(&maker, node);
    assert!(!selected.is_empty());
    assert_eq!(
        conditions,
        vec![Expression::attribute_value(&attr("papers.title"), "Graphs")]
    );
}

#[test]
fn test_column_maker_rejects_other_kinds() {
    let maker = title();
    let uri: Term = NamedNode::new("http://ex/Graphs").unwrap().into();
    assert!(select(&maker, uri).0.is_empty());
    let tagged: Term = Literal::new_language_tagged_literal("Graphs", "en")
        .unwrap()
        .into();
    assert!(select(&maker, tagged).0.is_empty());
    let typed: Term = Literal::new_typed_literal("42", xsd::INTEGER).into();
    assert!(select(&maker, typed).0.is_empty());
}

#[test]
fn test_language_maker_ignores_tag_case() {
    let maker = NodeMaker::typed(
        NodeType::language_literal("en").unwrap(),
        ValueMaker::column(attr("papers.title")),
        false,
    );
    let node: Term = Literal::new_language_tagged_literal("Graphs", "EN")
        .unwrap()
        .into();
    assert!(!select(&maker, node).0.is_empty());
    let german: Term = Literal::new_language_tagged_literal("Graphen", "de")
        .unwrap()
        .into();
    assert!(select(&maker, german).0.is_empty());
}

#[test]
fn test_fixed_maker_accepts_only_its_node() {
    let cites = NamedNode::new("http://ex/cites").unwrap();
    let maker = NodeMaker::fixed(cites.clone());
    let (selected, conditions) = select(&maker, cites.into());
    assert!(!selected.is_empty());
    assert!(conditions.is_empty());
    let other = NamedNode::new("http://ex/title").unwrap();
    assert!(select(&maker, other.into()).0.is_empty());
}

#[test]
fn test_date_maker_rejects_invalid_lexical_form() {
    let maker = NodeMaker::typed(NodeType::Date, ValueMaker::column(attr("papers.published")), false);
    let valid = maker.make_node(&row(&[("papers.published", "2024-01-31")])).unwrap();
    assert!(!select(&maker, valid).0.is_empty());
    assert!(maker.make_node(&row(&[("papers.published", "yesterday")])).is_none());
    let invalid: Term = Literal::new_typed_literal("yesterday", xsd::DATE).into();
    assert!(select(&maker, invalid).0.is_empty());
}

#[test]
fn test_boolean_maker_matches_both_database_forms() {
    let maker = NodeMaker::typed(NodeType::Boolean, ValueMaker::column(attr("papers.open")), false);
    let node = maker.make_node(&row(&[("papers.open", "1")])).unwrap();
    assert_eq!(node, Literal::new_typed_literal("true", xsd::BOOLEAN).into());
    let (selected, conditions) = select(&maker, node);
    assert!(!selected.is_empty());
    assert_eq!(conditions.len(), 1);
    assert!(!conditions[0].is_false());
}

#[test]
fn test_variables_leave_maker_unchanged() {
    let maker = paper_uri();
    let mut conditions = Vec::new();
    let selected = maker.select_node(&PatternNode::variable("p"), &mut conditions);
    assert_eq!(selected, maker);
    assert!(conditions.is_empty());
    assert_eq!(maker.select_node(&PatternNode::Any, &mut conditions), maker);
}
