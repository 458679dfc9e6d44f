use oxrdf::vocab::xsd;
use oxrdf::{Literal, NamedNode};
use rdbgraph::algebra::{Attribute, Expression};
use rdbgraph::nodes::{NodeMaker, NodeSetConstraintBuilder, NodeType};
use rdbgraph::values::ValueMaker;
use test_case::test_case;

fn attr(s: &str) -> Attribute {
    Attribute::parse(s).unwrap()
}

fn column(node_type: NodeType, a: &str) -> NodeMaker {
    NodeMaker::typed(node_type, ValueMaker::column(attr(a)), false)
}

fn solve(makers: &[NodeMaker]) -> NodeSetConstraintBuilder {
    let mut builder = NodeSetConstraintBuilder::new();
    for maker in makers {
        builder.add_node_maker(maker);
    }
    builder
}

#[test_case("papers.author", "people.id")]
#[test_case("people.id", "papers.author")]
#[test_case("lib.papers.id", "papers.id")]
fn test_two_attributes_give_their_equality(a: &str, b: &str) {
    let builder = solve(&[column(NodeType::Uri, a), column(NodeType::Uri, b)]);
    assert!(!builder.is_empty());
    assert!(!builder.is_unsupported());
    let constraint = builder.constraint();
    assert_eq!(constraint, Expression::attribute_equality(&attr(a), &attr(b)));
    assert_eq!(constraint.attributes(), [attr(a), attr(b)].into_iter().collect());
}

#[test]
fn test_same_attribute_is_true() {
    let builder = solve(&[
        column(NodeType::PlainLiteral, "papers.title"),
        column(NodeType::PlainLiteral, "papers.title"),
    ]);
    assert!(builder.constraint().is_true());
}

#[test_case(NodeType::Date, NodeType::Boolean ; "date and boolean")]
#[test_case(
    NodeType::typed_literal(xsd::INTEGER.into_owned()),
    NodeType::typed_literal(xsd::DECIMAL.into_owned())
    ; "integer and decimal"
)]
#[test_case(NodeType::PlainLiteral, NodeType::Date ; "plain and typed")]
#[test_case(
    NodeType::language_literal("en").unwrap(),
    NodeType::language_literal("de").unwrap()
    ; "two languages"
)]
#[test_case(NodeType::PlainLiteral, NodeType::language_literal("en").unwrap() ; "plain and tagged")]
#[test_case(NodeType::Uri, NodeType::PlainLiteral ; "uri and literal")]
fn test_incompatible_kinds_are_unsatisfiable(left: NodeType, right: NodeType) {
    let builder = solve(&[column(left, "a.x"), column(right, "b.y")]);
    assert!(builder.is_empty());
    assert!(builder.constraint().is_false());
}

#[test]
fn test_unsatisfiable_absorbs_later_makers() {
    let builder = solve(&[
        column(NodeType::Uri, "a.x"),
        column(NodeType::Blank, "b.y"),
        column(NodeType::Uri, "c.z"),
    ]);
    assert!(builder.is_empty());
}

#[test]
fn test_disjoint_pattern_prefixes_are_unsatisfiable() {
    let people = NodeMaker::typed(
        NodeType::Uri,
        ValueMaker::pattern("http://ex/person/@@people.id@@").unwrap(),
        true,
    );
    let papers = NodeMaker::typed(
        NodeType::Uri,
        ValueMaker::pattern("http://ex/paper/@@papers.id@@").unwrap(),
        true,
    );
    assert!(solve(&[people, papers]).is_empty());
}

#[test]
fn test_equivalent_patterns_compare_columns() {
    let author = NodeMaker::typed(
        NodeType::Uri,
        ValueMaker::pattern("http://ex/person/@@papers.author@@").unwrap(),
        true,
    );
    let person = NodeMaker::typed(
        NodeType::Uri,
        ValueMaker::pattern("http://ex/person/@@people.id@@").unwrap(),
        true,
    );
    let builder = solve(&[author, person]);
    assert_eq!(
        builder.constraint(),
        Expression::attribute_equality(&attr("papers.author"), &attr("people.id"))
    );
}

#[test]
fn test_fixed_node_pins_column_value() {
    let node = NamedNode::new("http://ex/person/7").unwrap();
    let builder = solve(&[
        NodeMaker::fixed(node.clone()),
        NodeMaker::typed(
            NodeType::Uri,
            ValueMaker::pattern("http://ex/person/@@people.id@@").unwrap(),
            true,
        ),
    ]);
    assert_eq!(
        builder.constraint(),
        Expression::attribute_value(&attr("people.id"), "7")
    );
    let other = solve(&[
        NodeMaker::fixed(node),
        NodeMaker::fixed(NamedNode::new("http://ex/person/8").unwrap()),
    ]);
    assert!(other.is_empty());
}

#[test_case("true", "t.flag = '1' OR t.flag = 'true'")]
#[test_case("false", "t.flag = '0' OR t.flag = 'false'")]
fn test_fixed_boolean_matches_every_stored_form(value: &str, expected: &str) {
    let fixed = NodeMaker::fixed(Literal::new_typed_literal(value, xsd::BOOLEAN));
    let builder = solve(&[fixed, column(NodeType::Boolean, "t.flag")]);
    assert!(!builder.is_empty());
    assert_eq!(builder.constraint().to_string(), expected);
}
