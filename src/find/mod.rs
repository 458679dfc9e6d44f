//! Pattern lookups: planning, lazy execution and result caching.

pub mod cache;
pub mod errors;
pub mod find_query;
pub mod graph;
pub mod iter;
pub mod pattern;

pub use cache::{CacheMetrics, TripleCache, TripleCacheConfig};
pub use errors::GraphError;
pub use find_query::{FindQuery, QueryPlan};
pub use graph::MappedGraph;
pub use iter::{BindingIter, TripleIter};
pub use pattern::{Bindings, PatternNode, TriplePattern};
