use std::fmt;
use std::str::FromStr;

use super::errors::CompileError;

/// A (possibly schema-qualified) table name.
///
/// The derived ordering compares the schema first, with schema-less names
/// sorting before qualified ones, then the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationName {
    schema: Option<String>,
    table: String,
}

impl RelationName {
    pub fn new(schema: Option<&str>, table: &str) -> Self {
        RelationName {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// `schema_table` or `table`, usable inside generated alias names.
    pub fn flattened(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}_{}", schema, self.table),
            None => self.table.clone(),
        }
    }

    pub fn attribute(&self, column: &str) -> Attribute {
        Attribute {
            relation: self.clone(),
            column: column.to_string(),
        }
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// A qualified column reference: `[schema.]table.column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute {
    relation: RelationName,
    column: String,
}

impl Attribute {
    pub fn new(schema: Option<&str>, table: &str, column: &str) -> Self {
        RelationName::new(schema, table).attribute(column)
    }

    /// Parses `table.column` or `schema.table.column`.
    pub fn parse(reference: &str) -> Result<Self, CompileError> {
        let parts: Vec<&str> = reference.trim().split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CompileError::InvalidAttribute {
                reference: reference.to_string(),
            });
        }
        match parts.as_slice() {
            [table, column] => Ok(Attribute::new(None, table, column)),
            [schema, table, column] => Ok(Attribute::new(Some(schema), table, column)),
            _ => Err(CompileError::InvalidAttribute {
                reference: reference.to_string(),
            }),
        }
    }

    pub fn relation_name(&self) -> &RelationName {
        &self.relation
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn table(&self) -> &str {
        self.relation.table()
    }

    pub fn schema(&self) -> Option<&str> {
        self.relation.schema()
    }

    /// The same column on another relation (used by alias renaming).
    pub fn with_relation(&self, relation: RelationName) -> Attribute {
        Attribute {
            relation,
            column: self.column.clone(),
        }
    }
}

impl FromStr for Attribute {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::parse(s)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation, self.column)
    }
}
