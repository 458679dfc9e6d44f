//! A rendered pattern value matches the pattern again, binding each column
//! to the value it was rendered from.

use rdbgraph::algebra::{Attribute, Expression, ProjectionSpec};
use rdbgraph::sql::ResultRow;
use rdbgraph::values::Pattern;
use test_case::test_case;

fn row(values: &[(&str, &str)]) -> ResultRow {
    ResultRow::from_pairs(values.iter().map(|(a, v)| {
        (
            ProjectionSpec::Attribute(Attribute::parse(a).unwrap()),
            Some(v.to_string()),
        )
    }))
}

fn expected(values: &[(&str, &str)]) -> Expression {
    Expression::conjunction(
        values
            .iter()
            .map(|(a, v)| Expression::attribute_value(&Attribute::parse(a).unwrap(), v)),
    )
}

#[test_case("http://ex/@@t.id@@", &[("t.id", "42")] ; "single column")]
#[test_case("http://ex/@@t.id@@", &[("t.id", "")] ; "empty value")]
#[test_case("http://ex/@@t.id@@", &[("t.id", "a/b/c")] ; "trailing column swallows slashes")]
#[test_case("@@t.a@@-@@t.b@@", &[("t.a", "x"), ("t.b", "y-z")] ; "no literal prefix")]
#[test_case(
    "http://ex/@@t.a@@/@@t.b@@#it",
    &[("t.a", "x y"), ("t.b", "7")]
    ; "literal suffix"
)]
#[test_case(
    "http://ex/@@t.name|urlencode@@",
    &[("t.name", "Smith & Sons / Co")]
    ; "urlencoded column"
)]
#[test_case(
    "http://ex/@@t.name|urlify@@",
    &[("t.name", "Grand Hotel")]
    ; "urlified column"
)]
#[test_case(
    "http://ex/@@t.name|encode@@/@@t.id@@",
    &[("t.name", "caf\u{e9}/bar"), ("t.id", "1")]
    ; "encoded column before a separator"
)]
fn test_rendered_value_matches_pattern(pattern: &str, values: &[(&str, &str)]) {
    let pattern = Pattern::parse(pattern).unwrap();
    let rendered = pattern.make_value(&row(values)).unwrap();
    let condition = pattern.value_expression(&rendered);
    assert!(!condition.is_false(), "{} did not match {}", rendered, pattern);
    assert_eq!(condition, expected(values));
}

#[test]
fn test_null_column_renders_nothing() {
    let pattern = Pattern::parse("http://ex/@@t.a@@/@@t.b@@").unwrap();
    assert_eq!(pattern.make_value(&row(&[("t.a", "x")])), None);
}

#[test_case("http://other/42" ; "different prefix")]
#[test_case("http://ex" ; "shorter than the literal")]
fn test_foreign_values_do_not_match(value: &str) {
    let pattern = Pattern::parse("http://ex/@@t.id@@").unwrap();
    assert!(pattern.value_expression(value).is_false());
}

#[test]
fn test_non_canonical_encoding_does_not_match() {
    let pattern = Pattern::parse("http://ex/@@t.name|urlencode@@").unwrap();
    // `%41` decodes to `A`, which this pattern would have rendered verbatim.
    assert!(pattern.value_expression("http://ex/%41").is_false());
}
