//! Shared fixtures: a small bibliography schema.
//!
//! ```text
//! papers(id, title, author, cites, year)
//! ```

use std::sync::Arc;

use oxrdf::NamedNode;
use rdbgraph::algebra::{Attribute, DatabaseId, Expression, Relation};
use rdbgraph::nodes::{NodeMaker, NodeType};
use rdbgraph::sql::dialect::Sql92;
use rdbgraph::sql::{ConnectedDb, DatabaseOptions, ScriptedConnector};
use rdbgraph::values::ValueMaker;
use rdbgraph::{EngineConfig, MappedGraph, PatternNode, TriplePattern, TripleRelation};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn attr(s: &str) -> Attribute {
    Attribute::parse(s).unwrap()
}

pub fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

pub fn uri(pattern: &str) -> NodeMaker {
    NodeMaker::typed(NodeType::Uri, ValueMaker::pattern(pattern).unwrap(), true)
}

pub fn papers(condition: Option<&str>) -> Relation {
    let mut builder = Relation::builder(DatabaseId::new("db")).unique(true);
    if let Some(condition) = condition {
        builder = builder.condition(Expression::sql(condition));
    }
    builder.build().unwrap()
}

/// `<paper> ex:title "title"`
pub fn title_bridge() -> TripleRelation {
    TripleRelation::new(
        "paper_title",
        papers(None),
        uri("http://ex/paper/@@papers.id@@"),
        NodeMaker::fixed(iri("http://ex/title")),
        NodeMaker::typed(
            NodeType::PlainLiteral,
            ValueMaker::column(attr("papers.title")),
            false,
        ),
    )
    .unwrap()
}

/// `<paper> ex:author <person>`
pub fn author_bridge() -> TripleRelation {
    TripleRelation::new(
        "paper_author",
        papers(None),
        uri("http://ex/paper/@@papers.id@@"),
        NodeMaker::fixed(iri("http://ex/author")),
        uri("http://ex/person/@@papers.author@@"),
    )
    .unwrap()
}

/// `<paper> ex:cites <paper>` for papers published after 2000.
pub fn cites_bridge() -> TripleRelation {
    TripleRelation::new(
        "paper_cites",
        papers(Some("papers.year > 2000")),
        uri("http://ex/paper/@@papers.id@@"),
        NodeMaker::fixed(iri("http://ex/cites")),
        uri("http://ex/paper/@@papers.cites@@"),
    )
    .unwrap()
}

pub fn database(connector: &ScriptedConnector) -> Arc<ConnectedDb> {
    Arc::new(ConnectedDb::new(
        DatabaseId::new("db"),
        Arc::new(Sql92),
        Box::new(connector.clone()),
        DatabaseOptions::default(),
    ))
}

pub fn graph(bridges: Vec<TripleRelation>, connector: &ScriptedConnector) -> MappedGraph {
    graph_with_config(bridges, connector, &EngineConfig::default())
}

pub fn graph_with_config(
    bridges: Vec<TripleRelation>,
    connector: &ScriptedConnector,
    config: &EngineConfig,
) -> MappedGraph {
    init_logging();
    MappedGraph::new(bridges, vec![database(connector)], config)
}

pub fn uncached() -> EngineConfig {
    EngineConfig {
        cache_enabled: false,
        ..Default::default()
    }
}

pub fn var(name: &str) -> PatternNode {
    PatternNode::variable(name)
}

pub fn node(s: &str) -> PatternNode {
    PatternNode::concrete(iri(s))
}

pub fn pattern(s: PatternNode, p: &str, o: PatternNode) -> TriplePattern {
    TriplePattern::new(s, node(p), o)
}
