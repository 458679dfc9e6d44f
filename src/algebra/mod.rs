//! Relational algebra over mapped tables.
//!
//! A [`relation::Relation`] describes the SQL behind one mapping rule. The
//! rest of the engine narrows relations with conditions, joins them,
//! renames them apart and finally renders them as SELECT statements.

pub mod alias_map;
pub mod attribute;
pub mod compatible_group;
pub mod errors;
pub mod expression;
pub mod join;
pub mod join_optimizer;
pub mod projection;
pub mod relation;

pub use alias_map::{AliasMap, ColumnRenamer, ColumnRenamerMap};
pub use attribute::{Attribute, RelationName};
pub use errors::CompileError;
pub use expression::Expression;
pub use join::{Join, JoinDirection};
pub use projection::{OrderSpec, ProjectionSpec};
pub use relation::{DatabaseId, Relation, RelationBuilder};
