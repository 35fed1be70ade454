//! Backend filter expressions, e.g. `role = "resident" && house = "h1"`.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::record::format_datetime;

/// A filter expression. Values are always quoted, so user input cannot
/// change the shape of the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter(String);

impl Filter {
    pub fn eq(field: &str, value: &str) -> Self {
        Self::compare(field, "=", &quote(value))
    }

    pub fn ne(field: &str, value: &str) -> Self {
        Self::compare(field, "!=", &quote(value))
    }

    /// Case-insensitive substring match.
    pub fn like(field: &str, value: &str) -> Self {
        Self::compare(field, "~", &quote(value))
    }

    /// A multi-relation field that contains `value`.
    pub fn contains(field: &str, value: &str) -> Self {
        Self::compare(field, "?=", &quote(value))
    }

    pub fn is_true(field: &str) -> Self {
        Self::compare(field, "=", "true")
    }

    pub fn is_false(field: &str) -> Self {
        Self::compare(field, "=", "false")
    }

    pub fn after(field: &str, at: &DateTime<Utc>) -> Self {
        Self::compare(field, ">", &quote(&format_datetime(at)))
    }

    pub fn at_or_after(field: &str, at: &DateTime<Utc>) -> Self {
        Self::compare(field, ">=", &quote(&format_datetime(at)))
    }

    pub fn before(field: &str, at: &DateTime<Utc>) -> Self {
        Self::compare(field, "<", &quote(&format_datetime(at)))
    }

    pub fn at_or_before(field: &str, at: &DateTime<Utc>) -> Self {
        Self::compare(field, "<=", &quote(&format_datetime(at)))
    }

    /// `field = v1 || field = v2 || ...`, or `None` for no values.
    pub fn any_of<I, S>(field: &str, values: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::any(values.into_iter().map(|v| Self::eq(field, v.as_ref())))
    }

    /// All of `filters`, or `None` when empty.
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Option<Self> {
        filters.into_iter().reduce(Filter::and)
    }

    /// Any of `filters`, or `None` when empty.
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Option<Self> {
        filters.into_iter().reduce(Filter::or)
    }

    pub fn and(self, other: Filter) -> Self {
        Self(format!("({} && {})", self.0, other.0))
    }

    pub fn or(self, other: Filter) -> Self {
        Self(format!("({} || {})", self.0, other.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn compare(field: &str, op: &str, value: &str) -> Self {
        Self(format!("{} {} {}", field, op, value))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.0
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_quotes_and_escapes_values() {
        assert_eq!(Filter::eq("first_name", "Ann").as_str(), r#"first_name = "Ann""#);
        assert_eq!(
            Filter::eq("note", r#"say "hi" \o/"#).as_str(),
            r#"note = "say \"hi\" \\o/""#
        );
    }

    #[test]
    fn test_combinators_group_operands() {
        let filter = Filter::eq("role", "resident").and(Filter::like("first_name", "som"));
        assert_eq!(filter.as_str(), r#"(role = "resident" && first_name ~ "som")"#);

        let ids = Filter::any_of("id", ["a1", "a2", "a3"]).unwrap();
        assert_eq!(ids.as_str(), r#"((id = "a1" || id = "a2") || id = "a3")"#);
    }

    #[test]
    fn test_empty_sets_give_none() {
        assert!(Filter::any_of("id", Vec::<String>::new()).is_none());
        assert!(Filter::all(Vec::new()).is_none());
        assert_eq!(Filter::all([Filter::is_true("active")]).unwrap().as_str(), "active = true");
    }

    #[test]
    fn test_datetime_bounds_use_backend_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Filter::at_or_after("created", &at).as_str(),
            r#"created >= "2024-05-01 00:00:00.000Z""#
        );
    }
}
