use std::time::Duration;

use rdbgraph::sql::scripted::row;
use rdbgraph::sql::{ExecutionError, ScriptedConnector};
use rdbgraph::{GraphError, PatternNode, TriplePattern};

use super::common::*;

fn titles() -> TriplePattern {
    pattern(PatternNode::Any, "http://ex/title", var("t"))
}

fn scripted() -> ScriptedConnector {
    let connector = ScriptedConnector::new();
    connector.respond_when(
        "FROM papers",
        vec![
            row(&[("papers.id", "1"), ("papers.title", "Graphs")]),
            row(&[("papers.id", "2"), ("papers.title", "Tables")]),
        ],
    );
    connector
}

#[test]
fn test_uncached_lookup_is_lazy() {
    let connector = scripted();
    let graph = graph_with_config(vec![title_bridge()], &connector, &uncached());

    let mut triples = graph.find(&titles()).unwrap();
    assert_eq!(connector.execution_count(), 0);
    assert!(triples.next().unwrap().is_ok());
    assert_eq!(connector.execution_count(), 1);
    triples.close();
    assert!(triples.is_closed());
    assert!(triples.next().is_none());
}

#[test]
fn test_rows_with_null_values_are_skipped() {
    let connector = ScriptedConnector::new();
    connector.respond_when(
        "FROM papers",
        vec![
            row(&[("papers.id", "1")]),
            row(&[("papers.id", "2"), ("papers.title", "Tables")]),
        ],
    );
    let graph = graph_with_config(vec![title_bridge()], &connector, &uncached());
    let triples: Vec<_> = graph
        .find(&titles())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].object.to_string(), "\"Tables\"");
}

#[test]
fn test_timeout_ends_the_sequence() {
    let connector = scripted();
    connector.fail_next(ExecutionError::QueryTimeout {
        sql: "SELECT ...".into(),
        timeout: Duration::from_secs(5),
    });
    let graph = graph_with_config(vec![title_bridge()], &connector, &uncached());

    let mut triples = graph.find(&titles()).unwrap();
    let error = triples.next().unwrap().unwrap_err();
    assert!(error.is_timeout());
    assert!(triples.next().is_none());
}

#[test]
fn test_cached_lookup_propagates_errors_and_caches_nothing() {
    let connector = scripted();
    connector.fail_next(ExecutionError::Sql {
        sql: "SELECT ...".into(),
        message: "no such table".into(),
    });
    let graph = graph(vec![title_bridge()], &connector);

    assert!(matches!(
        graph.find(&titles()),
        Err(GraphError::Execution(ExecutionError::Sql { .. }))
    ));
    assert_eq!(graph.cache_metrics().size, 0);
    assert_eq!(graph.find(&titles()).unwrap().count(), 2);
}

#[test]
fn test_lost_connection_is_retried_once() {
    let connector = scripted();
    connector.fail_next(ExecutionError::ConnectionLost {
        message: "connection reset".into(),
    });
    let graph = graph(vec![title_bridge()], &connector);

    assert_eq!(graph.find(&titles()).unwrap().count(), 2);
    assert_eq!(connector.connect_count(), 2);
    assert_eq!(connector.execution_count(), 1);
}

#[test]
fn test_is_empty_stops_at_first_triple() {
    let connector = scripted();
    let graph = graph(vec![title_bridge()], &connector);
    assert!(!graph.is_empty().unwrap());

    let nothing = ScriptedConnector::new();
    let empty = graph_with_config(vec![title_bridge()], &nothing, &uncached());
    assert!(empty.is_empty().unwrap());
}

#[test]
fn test_closed_graph_rejects_lookups() {
    let connector = scripted();
    let graph = graph(vec![title_bridge()], &connector);
    graph.close();
    assert!(graph.is_closed());
    assert!(matches!(graph.find(&titles()), Err(GraphError::Closed)));
    assert!(matches!(graph.find_bindings(&[titles()]), Err(GraphError::Closed)));
    assert_eq!(connector.execution_count(), 0);
}

#[test]
fn test_graph_is_shared_between_threads() {
    let connector = scripted();
    let graph = std::sync::Arc::new(graph_with_config(vec![title_bridge()], &connector, &uncached()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let graph = graph.clone();
            std::thread::spawn(move || graph.find(&titles()).unwrap().count())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
    assert_eq!(connector.execution_count(), 4);
}
