//! Vendor-specific SQL syntax, injected as strategy objects.

use std::collections::HashMap;
use std::fmt;

use crate::algebra::alias_map::AliasMap;
use crate::algebra::attribute::{Attribute, RelationName};

/// Coarse column type hints. Only used to render constants so that a
/// comparison against a numeric or boolean column is well-typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    #[default]
    Character,
    Numeric,
    Boolean,
    Date,
    Timestamp,
    Other,
}

/// Column types keyed by the original (unaliased) attribute.
#[derive(Debug, Clone, Default)]
pub struct ColumnTypes {
    types: HashMap<Attribute, ColumnType>,
}

impl ColumnTypes {
    pub fn insert(&mut self, attribute: Attribute, column_type: ColumnType) {
        self.types.insert(attribute, column_type);
    }

    pub fn get(&self, attribute: &Attribute) -> ColumnType {
        self.types.get(attribute).copied().unwrap_or_default()
    }
}

impl FromIterator<(Attribute, ColumnType)> for ColumnTypes {
    fn from_iter<I: IntoIterator<Item = (Attribute, ColumnType)>>(iter: I) -> Self {
        ColumnTypes {
            types: iter.into_iter().collect(),
        }
    }
}

/// Everything needed to turn an expression into executable SQL.
pub struct SqlContext<'a> {
    pub dialect: &'a dyn SqlDialect,
    pub column_types: &'a ColumnTypes,
    pub aliases: &'a AliasMap,
}

impl<'a> SqlContext<'a> {
    pub fn new(
        dialect: &'a dyn SqlDialect,
        column_types: &'a ColumnTypes,
        aliases: &'a AliasMap,
    ) -> Self {
        SqlContext {
            dialect,
            column_types,
            aliases,
        }
    }

    /// Looks the type up on the physical table behind any alias.
    pub fn column_type(&self, attribute: &Attribute) -> ColumnType {
        self.column_types
            .get(&self.aliases.original_of_attr(attribute))
    }
}

fn is_plain_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Quoting, literal and clause syntax of one SQL vendor.
pub trait SqlDialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, identifier: &str) -> String {
        if is_plain_identifier(identifier) {
            identifier.to_string()
        } else {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }

    fn quote_relation_name(&self, name: &RelationName) -> String {
        match name.schema() {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(name.table())
            ),
            None => self.quote_identifier(name.table()),
        }
    }

    fn quote_attribute(&self, attribute: &Attribute) -> String {
        format!(
            "{}.{}",
            self.quote_relation_name(attribute.relation_name()),
            self.quote_identifier(attribute.column())
        )
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn concat(&self, parts: &[String]) -> String {
        format!("({})", parts.join(" || "))
    }

    fn boolean_literal(&self, value: bool) -> String {
        String::from(if value { "TRUE" } else { "FALSE" })
    }

    fn true_literal(&self) -> &'static str {
        "1 = 1"
    }

    fn false_literal(&self) -> &'static str {
        "1 = 0"
    }

    /// Text inserted right after `SELECT [DISTINCT]` to limit the result.
    fn limit_prefix(&self, _limit: u64) -> Option<String> {
        None
    }

    /// Clause appended at the end of the statement to limit the result.
    fn limit_suffix(&self, limit: u64) -> Option<String> {
        Some(format!("LIMIT {}", limit))
    }
}

/// ANSI SQL; also fits PostgreSQL, SQLite and HSQLDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sql92;

impl SqlDialect for Sql92 {
    fn name(&self) -> &'static str {
        "SQL92"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn concat(&self, parts: &[String]) -> String {
        format!("CONCAT({})", parts.join(", "))
    }

    fn boolean_literal(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouse;

impl SqlDialect for ClickHouse {
    fn name(&self) -> &'static str {
        "ClickHouse"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        if is_plain_identifier(identifier) {
            identifier.to_string()
        } else {
            format!("`{}`", identifier.replace('`', "\\`"))
        }
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    // concat() only accepts strings; toString is a no-op on string operands.
    fn concat(&self, parts: &[String]) -> String {
        let parts: Vec<String> = parts.iter().map(|p| format!("toString({})", p)).collect();
        format!("concat({})", parts.join(", "))
    }

    fn boolean_literal(&self, value: bool) -> String {
        String::from(if value { "true" } else { "false" })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl SqlDialect for SqlServer {
    fn name(&self) -> &'static str {
        "SQL Server"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("[{}]", identifier.replace(']', "]]"))
    }

    fn concat(&self, parts: &[String]) -> String {
        format!("({})", parts.join(" + "))
    }

    fn boolean_literal(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    fn limit_prefix(&self, limit: u64) -> Option<String> {
        Some(format!("TOP {}", limit))
    }

    fn limit_suffix(&self, _limit: u64) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql92_quotes_only_when_needed() {
        assert_eq!(Sql92.quote_identifier("papers"), "papers");
        assert_eq!(Sql92.quote_identifier("Paper Title"), "\"Paper Title\"");
        let a = Attribute::parse("iswc.papers.id").unwrap();
        assert_eq!(Sql92.quote_attribute(&a), "iswc.papers.id");
    }

    #[test]
    fn test_vendor_quoting() {
        let a = Attribute::parse("papers.id").unwrap();
        assert_eq!(MySql.quote_attribute(&a), "`papers`.`id`");
        assert_eq!(SqlServer.quote_attribute(&a), "[papers].[id]");
        assert_eq!(ClickHouse.quote_string("it's"), "'it\\'s'");
    }

    #[test]
    fn test_limit_syntax() {
        assert_eq!(Sql92.limit_suffix(10), Some("LIMIT 10".to_string()));
        assert_eq!(SqlServer.limit_prefix(10), Some("TOP 10".to_string()));
        assert_eq!(SqlServer.limit_suffix(10), None);
    }

    #[test]
    fn test_column_type_lookup_goes_through_aliases() {
        let mut types = ColumnTypes::default();
        types.insert(Attribute::parse("papers.year").unwrap(), ColumnType::Numeric);
        let aliases = AliasMap::single(
            RelationName::new(None, "papers"),
            RelationName::new(None, "T2_papers"),
        );
        let ctx = SqlContext::new(&Sql92, &types, &aliases);
        assert_eq!(
            ctx.column_type(&Attribute::parse("T2_papers.year").unwrap()),
            ColumnType::Numeric
        );
    }
}
