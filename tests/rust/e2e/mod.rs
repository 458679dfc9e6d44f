//! End-to-end tests - Lookups against a live ClickHouse server
//!
//! These read the server's own `system.databases` table, so no fixture data is
//! needed. Configure the server with `CLICKHOUSE_URL` and `CLICKHOUSE_USER`
//! (a `.env` file works too) and run with `cargo test --test e2e -- --ignored`.

use std::sync::Arc;

use oxrdf::{Literal, NamedNode, Triple};
use rdbgraph::algebra::{Attribute, DatabaseId, Relation};
use rdbgraph::find::Bindings;
use rdbgraph::nodes::{NodeMaker, NodeType};
use rdbgraph::sql::clickhouse::ClickHouseConnector;
use rdbgraph::sql::dialect::ClickHouse;
use rdbgraph::sql::{ConnectedDb, DatabaseOptions};
use rdbgraph::values::ValueMaker;
use rdbgraph::{EngineConfig, MappedGraph, PatternNode, TriplePattern, TripleRelation};

fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

fn attr(s: &str) -> Attribute {
    Attribute::parse(s).unwrap()
}

/// `<http://ex/database/name> ex:name "name"` for every database on the
/// server.
fn database_bridge() -> TripleRelation {
    TripleRelation::new(
        "database_name",
        Relation::builder(DatabaseId::new("clickhouse"))
            .unique(true)
            .build()
            .unwrap(),
        NodeMaker::typed(
            NodeType::Uri,
            ValueMaker::pattern("http://ex/database/@@system.databases.name@@").unwrap(),
            true,
        ),
        NodeMaker::fixed(iri("http://ex/name")),
        NodeMaker::typed(
            NodeType::PlainLiteral,
            ValueMaker::column(attr("system.databases.name")),
            false,
        ),
    )
    .unwrap()
}

fn graph(config: EngineConfig) -> MappedGraph {
    let _ = env_logger::builder().is_test(true).try_init();
    let connector = ClickHouseConnector::from_env().expect("ClickHouse settings");
    let database = ConnectedDb::new(
        DatabaseId::new("clickhouse"),
        Arc::new(ClickHouse),
        Box::new(connector),
        DatabaseOptions::from_config(&config),
    );
    MappedGraph::new(vec![database_bridge()], vec![Arc::new(database)], &config)
}

#[test]
#[ignore = "requires a running ClickHouse server"]
fn test_bound_subject_reads_one_row() {
    let graph = graph(EngineConfig::default());
    let lookup = TriplePattern::new(
        PatternNode::concrete(iri("http://ex/database/system")),
        PatternNode::Any,
        PatternNode::Any,
    );
    let triples: Vec<Triple> = graph
        .find(&lookup)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].object.to_string(), "\"system\"");
}

#[test]
#[ignore = "requires a running ClickHouse server"]
fn test_result_size_limit_bounds_rows() {
    let graph = graph(EngineConfig {
        result_size_limit: 1,
        cache_enabled: false,
        ..Default::default()
    });
    let count = graph
        .find(&TriplePattern::any())
        .unwrap()
        .filter_map(Result::ok)
        .count();
    assert_eq!(count, 1);
}

#[test]
#[ignore = "requires a running ClickHouse server"]
fn test_self_join_on_databases() {
    let graph = graph(EngineConfig::default());
    let name = |o: PatternNode| {
        TriplePattern::new(
            PatternNode::variable("d"),
            PatternNode::concrete(iri("http://ex/name")),
            o,
        )
    };
    let lookup = [
        name(PatternNode::variable("n")),
        name(PatternNode::concrete(Literal::new_simple_literal("system"))),
    ];
    let solutions: Vec<Bindings> = graph
        .find_bindings(&lookup)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0]["d"], iri("http://ex/database/system").into());
}

#[test]
#[ignore = "requires a running ClickHouse server"]
fn test_closed_graph_releases_connection() {
    let graph = graph(EngineConfig::default());
    assert!(!graph.is_empty().unwrap());
    graph.close();
    assert!(graph.find(&TriplePattern::any()).is_err());
}
