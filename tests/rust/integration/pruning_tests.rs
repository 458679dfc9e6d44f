use oxrdf::{Literal, Triple};
use rdbgraph::nodes::{NodeMaker, NodeType};
use rdbgraph::sql::scripted::row;
use rdbgraph::sql::ScriptedConnector;
use rdbgraph::values::ValueMaker;
use rdbgraph::{PatternNode, TriplePattern, TripleRelation};

use super::common::*;

fn find_all(graph: &rdbgraph::MappedGraph, pattern: &TriplePattern) -> Vec<Triple> {
    graph
        .find(pattern)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn test_uri_object_prunes_literal_bridge_without_sql() {
    let connector = ScriptedConnector::new();
    let graph = graph(vec![title_bridge()], &connector);
    let lookup = pattern(PatternNode::Any, "http://ex/title", node("http://ex/Graphs"));

    assert!(graph.plan(&lookup).unwrap().is_empty());
    assert!(find_all(&graph, &lookup).is_empty());
    assert_eq!(connector.execution_count(), 0);
    assert_eq!(connector.connect_count(), 0);
}

#[test]
fn test_only_matching_bridge_is_queried() {
    // Same predicate, one bridge producing literals and one producing URIs.
    let literal_bridge = TripleRelation::new(
        "paper_author_name",
        papers(None),
        uri("http://ex/paper/@@papers.id@@"),
        NodeMaker::fixed(iri("http://ex/author")),
        NodeMaker::typed(
            NodeType::PlainLiteral,
            ValueMaker::column(attr("papers.author_name")),
            false,
        ),
    )
    .unwrap();
    let connector = ScriptedConnector::new();
    connector.respond_when(
        "FROM papers",
        vec![row(&[("papers.id", "1"), ("papers.author", "7")])],
    );
    let graph = graph(vec![literal_bridge, author_bridge()], &connector);

    let lookup = pattern(PatternNode::Any, "http://ex/author", node("http://ex/person/7"));
    let triples = find_all(&graph, &lookup);

    let statements = connector.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("papers.author = '7'"), "{}", statements[0]);
    assert!(!statements[0].contains("author_name"), "{}", statements[0]);
    assert_eq!(
        triples,
        vec![Triple::new(
            iri("http://ex/paper/1"),
            iri("http://ex/author"),
            iri("http://ex/person/7"),
        )]
    );
}

#[test]
fn test_literal_object_prunes_uri_bridge() {
    let connector = ScriptedConnector::new();
    connector.respond_when("FROM papers", vec![row(&[("papers.id", "1")])]);
    let graph = graph(vec![title_bridge(), author_bridge()], &connector);
    let lookup = TriplePattern::new(
        PatternNode::Any,
        PatternNode::Any,
        PatternNode::concrete(Literal::new_simple_literal("Graphs")),
    );

    let plan = graph.plan(&lookup).unwrap();
    assert_eq!(plan.statements.len(), 1);
    let members: Vec<&str> = plan.statements[0]
        .members
        .iter()
        .map(|m| m.bridge.name())
        .collect();
    assert_eq!(members, vec!["paper_title"]);

    let triples = find_all(&graph, &lookup);
    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].subject.to_string(), "<http://ex/paper/1>");
}

#[test]
fn test_unbound_pattern_merges_compatible_bridges() {
    let connector = ScriptedConnector::new();
    connector.respond_when(
        "FROM papers",
        vec![row(&[
            ("papers.id", "1"),
            ("papers.title", "Graphs"),
            ("papers.author", "7"),
        ])],
    );
    let graph = graph(vec![title_bridge(), author_bridge()], &connector);
    let triples = find_all(&graph, &TriplePattern::any());

    // Both bridges read the same rows of the same table.
    assert_eq!(connector.execution_count(), 1);
    assert_eq!(triples.len(), 2);
}
