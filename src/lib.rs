//! rdbgraph - Read-only RDF view over relational databases
//!
//! This crate answers triple pattern lookups against existing tables, without
//! materializing any triples:
//! - Relational algebra for the SQL shape of each mapping rule
//! - Value and node makers turning rows into RDF terms and back
//! - A constraint solver for nodes shared between joined rules
//! - SQL generation, execution and result caching

pub mod algebra;
pub mod config;
pub mod find;
pub mod nodes;
pub mod sql;
pub mod triples;
pub mod values;

pub use config::EngineConfig;
pub use find::{GraphError, MappedGraph, PatternNode, TriplePattern};
pub use triples::TripleRelation;
