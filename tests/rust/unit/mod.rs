//! Unit tests - Algebraic properties of the mapping layers
//!
//! Nothing here touches a database; rows are built by hand.

mod alias_map_tests;
mod constraint_solver_tests;
mod node_selection_tests;
mod pattern_round_trip_tests;
