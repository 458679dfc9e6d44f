use std::fmt;

use crate::algebra::alias_map::ColumnRenamer;
use crate::algebra::attribute::Attribute;
use crate::algebra::expression::Expression;
use crate::algebra::projection::ProjectionSpec;
use crate::sql::connection::ResultRow;

/// Reads the value of a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnValue {
    attribute: Attribute,
}

impl ColumnValue {
    pub fn new(attribute: Attribute) -> Self {
        ColumnValue { attribute }
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn make_value(&self, row: &ResultRow) -> Option<String> {
        row.get_attribute(&self.attribute).map(str::to_string)
    }

    pub fn value_expression(&self, value: &str) -> Expression {
        Expression::attribute_value(&self.attribute, value)
    }

    pub fn projection_spec(&self) -> ProjectionSpec {
        ProjectionSpec::Attribute(self.attribute.clone())
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Self {
        ColumnValue::new(renamer.apply_to_attribute(&self.attribute))
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({})", self.attribute)
    }
}
