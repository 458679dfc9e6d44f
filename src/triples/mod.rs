//! Property bridges and joins between them.

pub mod joiner;
pub mod triple_relation;

pub use joiner::{JoinOutcome, TripleRelationJoiner};
pub use triple_relation::{Position, TripleRelation};
