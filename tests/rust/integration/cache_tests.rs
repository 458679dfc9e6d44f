use rdbgraph::sql::scripted::row;
use rdbgraph::sql::ScriptedConnector;
use rdbgraph::PatternNode;

use super::common::*;

fn count(graph: &rdbgraph::MappedGraph, lookup: &rdbgraph::TriplePattern) -> usize {
    graph.find(lookup).unwrap().filter_map(Result::ok).count()
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
fn test_repeated_lookup_runs_sql_once() {
    let connector = scripted();
    let graph = graph(vec![title_bridge()], &connector);
    let lookup = pattern(PatternNode::Any, "http://ex/title", var("t"));

    assert_eq!(count(&graph, &lookup), 2);
    assert_eq!(count(&graph, &lookup), 2);
    assert_eq!(connector.execution_count(), 1);

    let metrics = graph.cache_metrics();
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.size, 1);
}

#[test]
fn test_clear_cache_forces_second_execution() {
    let connector = scripted();
    let graph = graph(vec![title_bridge()], &connector);
    let lookup = pattern(PatternNode::Any, "http://ex/title", var("t"));

    assert_eq!(count(&graph, &lookup), 2);
    graph.clear_cache();
    assert_eq!(count(&graph, &lookup), 2);
    assert_eq!(connector.execution_count(), 2);
}

#[test]
fn test_disabled_cache_always_executes() {
    let connector = scripted();
    let graph = graph_with_config(vec![title_bridge()], &connector, &uncached());
    let lookup = pattern(PatternNode::Any, "http://ex/title", var("t"));

    count(&graph, &lookup);
    count(&graph, &lookup);
    assert_eq!(connector.execution_count(), 2);
    assert_eq!(graph.cache_metrics().size, 0);
}

#[test]
fn test_recompile_drops_cached_results() {
    let connector = scripted();
    let graph = graph(vec![title_bridge()], &connector);
    let lookup = pattern(PatternNode::Any, "http://ex/title", var("t"));

    assert_eq!(count(&graph, &lookup), 2);
    graph.recompile(vec![author_bridge()]);
    assert_eq!(count(&graph, &lookup), 0);
    assert_eq!(graph.cache_metrics().hits, 0);
}

#[test]
fn test_capacity_evicts_least_recent_pattern() {
    let connector = scripted();
    let graph = graph(vec![title_bridge()], &connector);
    graph.set_cache_capacity(1);
    let titles = pattern(PatternNode::Any, "http://ex/title", var("t"));
    let first = pattern(node("http://ex/paper/1"), "http://ex/title", var("t"));

    count(&graph, &titles);
    count(&graph, &first);
    count(&graph, &titles);
    assert_eq!(connector.execution_count(), 3);
    assert_eq!(graph.cache_metrics().evictions, 2);
}
