//! Node makers: from rows to RDF terms, and from terms back to conditions.

pub mod constraint_builder;
pub mod node_maker;
pub mod node_set_filter;
pub mod node_type;

pub use constraint_builder::{BuilderState, NodeSetConstraintBuilder};
pub use node_maker::NodeMaker;
pub use node_set_filter::NodeSetFilter;
pub use node_type::NodeType;
