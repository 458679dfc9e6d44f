//! Integration tests - Lookups through MappedGraph against a scripted database
//!
//! These tests verify that planning, SQL generation, execution and caching
//! work together. The database is a ScriptedConnector, so every executed
//! statement can be inspected.

mod common;

mod cache_tests;
mod execution_tests;
mod pruning_tests;
mod self_join_tests;
mod uri_pattern_tests;
