use oxrdf::Triple;
use rdbgraph::algebra::{DatabaseId, Relation};
use rdbgraph::nodes::{NodeMaker, NodeType};
use rdbgraph::sql::scripted::row;
use rdbgraph::sql::ScriptedConnector;
use rdbgraph::values::ValueMaker;
use rdbgraph::{PatternNode, TriplePattern, TripleRelation};

use super::common::*;

fn label_bridge() -> TripleRelation {
    TripleRelation::new(
        "thing_label",
        Relation::builder(DatabaseId::new("db"))
            .unique(true)
            .build()
            .unwrap(),
        uri("http://ex/@@t.id@@"),
        NodeMaker::fixed(iri("http://ex/label")),
        NodeMaker::typed(NodeType::PlainLiteral, ValueMaker::column(attr("t.label")), false),
    )
    .unwrap()
}

fn subject(s: &str) -> TriplePattern {
    TriplePattern::new(node(s), PatternNode::Any, PatternNode::Any)
}

#[test]
fn test_matching_subject_constrains_column() {
    let selected = label_bridge()
        .select_triple(&subject("http://ex/42"))
        .unwrap();
    assert_eq!(selected.relation().condition().to_string(), "t.id = '42'");
}

#[test]
fn test_foreign_subject_is_unsatisfiable() {
    assert!(label_bridge()
        .select_triple(&subject("http://other/42"))
        .is_none());
}

#[test]
fn test_matching_subject_reaches_sql() {
    let connector = ScriptedConnector::new();
    connector.respond_when("t.id = '42'", vec![row(&[("t.label", "answer")])]);
    let graph = graph(vec![label_bridge()], &connector);

    let triples: Vec<Triple> = graph
        .find(&subject("http://ex/42"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let statements = connector.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("WHERE t.id = '42'"), "{}", statements[0]);
    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].subject.to_string(), "<http://ex/42>");
    assert_eq!(triples[0].object.to_string(), "\"answer\"");
}

#[test]
fn test_foreign_subject_issues_no_sql() {
    let connector = ScriptedConnector::new();
    let graph = graph(vec![label_bridge()], &connector);
    let triples: Vec<Triple> = graph
        .find(&subject("http://other/42"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(triples.is_empty());
    assert_eq!(connector.execution_count(), 0);
}
