use oxrdf::{NamedNode, Term};

use crate::algebra::attribute::Attribute;
use crate::algebra::expression::Expression;
use crate::values::{BlankNodeId, Pattern, TranslatorRef};

/// Receives a description of the set of nodes a node maker can produce.
///
/// Node makers and value makers report their shape through these calls;
/// [`super::constraint_builder::NodeSetConstraintBuilder`] intersects the
/// descriptions of several makers that must denote the same node.
pub trait NodeSetFilter {
    /// No node at all.
    fn limit_to_empty_set(&mut self);

    /// Exactly this node.
    fn limit_to(&mut self, node: &Term);

    fn limit_to_uris(&mut self);

    fn limit_to_blank_nodes(&mut self);

    /// Literals with the given language tag or datatype. Plain literals pass
    /// neither.
    fn limit_to_literals(&mut self, language: Option<&str>, datatype: Option<&NamedNode>);

    /// Nodes whose lexical value is exactly `value`.
    fn limit_values(&mut self, value: &str);

    fn limit_values_to_attribute(&mut self, attribute: &Attribute);

    fn limit_values_to_pattern(&mut self, pattern: &Pattern);

    fn limit_values_to_blank_node_id(&mut self, id: &BlankNodeId);

    fn limit_values_to_expression(&mut self, expression: &Expression);

    fn set_uses_translator(&mut self, translator: &TranslatorRef);
}
