use oxrdf::Term;
use rdbgraph::find::Bindings;
use rdbgraph::sql::scripted::row;
use rdbgraph::sql::ScriptedConnector;

use super::common::*;

fn paper(id: &str) -> Term {
    iri(&format!("http://ex/paper/{}", id)).into()
}

#[test]
fn test_citation_chain_aliases_second_table() {
    let connector = ScriptedConnector::new();
    connector.respond_when(
        "T2_papers",
        vec![row(&[
            ("papers.id", "1"),
            ("papers.cites", "2"),
            ("T2_papers.id", "2"),
            ("T2_papers.cites", "3"),
        ])],
    );
    let graph = graph(vec![cites_bridge()], &connector);

    let solutions: Vec<Bindings> = graph
        .find_bindings(&[
            pattern(var("a"), "http://ex/cites", var("b")),
            pattern(var("b"), "http://ex/cites", var("c")),
        ])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let statements = connector.statements();
    assert_eq!(statements.len(), 1);
    let sql = &statements[0];
    assert!(sql.contains("papers AS T2_papers"), "{}", sql);
    // The filter holds on both sides; only the aliased side is renamed.
    assert_eq!(sql.matches("papers.year > 2000").count(), 2, "{}", sql);
    assert_eq!(sql.matches("T2_papers.year > 2000").count(), 1, "{}", sql);
    assert!(sql.contains("T2_papers.id = papers.cites"), "{}", sql);

    let expected: Bindings = [
        ("a".to_string(), paper("1")),
        ("b".to_string(), paper("2")),
        ("c".to_string(), paper("3")),
    ]
    .into_iter()
    .collect();
    assert_eq!(solutions, vec![expected]);
}

#[test]
fn test_single_pattern_needs_no_alias() {
    let connector = ScriptedConnector::new();
    connector.respond_when("FROM papers", vec![row(&[("papers.id", "1"), ("papers.cites", "2")])]);
    let graph = graph(vec![cites_bridge()], &connector);

    let solutions: Vec<Bindings> = graph
        .find_bindings(&[pattern(var("a"), "http://ex/cites", var("b"))])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0]["b"], paper("2"));
    assert!(!connector.statements()[0].contains("T2_"));
}

#[test]
fn test_join_across_predicates() {
    let connector = ScriptedConnector::new();
    connector.respond_when(
        "FROM",
        vec![row(&[
            ("papers.id", "1"),
            ("papers.author", "7"),
            ("T2_papers.id", "1"),
            ("T2_papers.title", "Graphs"),
        ])],
    );
    let graph = graph(vec![author_bridge(), title_bridge()], &connector);

    let solutions: Vec<Bindings> = graph
        .find_bindings(&[
            pattern(var("p"), "http://ex/author", node("http://ex/person/7")),
            pattern(var("p"), "http://ex/title", var("t")),
        ])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let sql = &connector.statements()[0];
    assert!(sql.contains("papers.author = '7'"), "{}", sql);
    assert!(sql.contains("T2_papers.id = papers.id"), "{}", sql);
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0]["p"], paper("1"));
    assert_eq!(solutions[0]["t"].to_string(), "\"Graphs\"");
}

#[test]
fn test_empty_pattern_list_has_one_solution() {
    let connector = ScriptedConnector::new();
    let graph = graph(vec![cites_bridge()], &connector);
    let solutions: Vec<Bindings> = graph
        .find_bindings(&[])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(solutions, vec![Bindings::new()]);
    assert_eq!(connector.execution_count(), 0);
}
