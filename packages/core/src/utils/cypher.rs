//! Query text fragments
//!
//! Renders property bags and match conditions into the inline literal syntax
//! the graph session accepts. Values are written JSON-style: strings are
//! quoted and escaped, numbers and booleans are bare, lists are bracketed.

use crate::models::{Properties, Value};
use chrono::SecondsFormat;
use std::fmt;

/// How several like-patterns are combined in a `WHERE` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => f.write_str("AND"),
            Combinator::Or => f.write_str("OR"),
        }
    }
}

/// Quote an identifier (label, relation type, property key) when needed.
///
/// Plain `[A-Za-z_][A-Za-z0-9_]*` names are emitted as-is; anything else is
/// wrapped in backticks with embedded backticks doubled.
pub fn identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Render a single value as a literal.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => {
            serde_json::to_string(f).unwrap_or_else(|_| "null".to_string())
        }
        Value::Float(_) => "null".to_string(),
        Value::String(s) => quote(s),
        Value::Date(d) => quote(&d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Map(map) => to_query_props(map),
    }
}

fn quote(s: &str) -> String {
    // serde_json never fails on a plain str
    serde_json::to_string(s).unwrap_or_default()
}

/// Serialize a property bag into an inline property literal.
///
/// An empty bag renders as `{}`, never as an empty string, so the result can
/// always be interpolated into a pattern.
///
/// ```rust
/// # use cooper_ogm::models::{props, Properties, Value};
/// # use cooper_ogm::utils::to_query_props;
/// assert_eq!(to_query_props(&Properties::new()), "{}");
/// assert_eq!(to_query_props(&props([("a", Value::from(1))])), "{a: 1}");
/// ```
pub fn to_query_props(properties: &Properties) -> String {
    if properties.is_empty() {
        return "{}".to_string();
    }

    let mut out = String::from("{");
    for (i, (key, value)) in properties.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("{}: {}", identifier(key), literal(value)));
    }
    out.push('}');
    out
}

/// Build a `WHERE` clause requiring each property of `alias` to regex-match
/// its pattern. Returns an empty string for an empty map.
///
/// ```rust
/// # use cooper_ogm::utils::{to_regex_query, Combinator};
/// # use std::collections::BTreeMap;
/// let like = BTreeMap::from([("name".to_string(), ".*foo.*".to_string())]);
/// assert_eq!(to_regex_query("n", &like, Combinator::And), r#"WHERE n.name =~ ".*foo.*""#);
/// ```
pub fn to_regex_query<'a, I>(alias: &str, like: I, combinator: Combinator) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let conditions: Vec<String> = like
        .into_iter()
        .map(|(prop, pattern)| format!("{}.{} =~ {}", alias, identifier(prop), quote(pattern)))
        .collect();

    if conditions.is_empty() {
        return String::new();
    }

    format!("WHERE {}", conditions.join(&format!(" {} ", combinator)))
}
