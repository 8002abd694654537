//! Utility functions shared across the crate
//!
//! - [`coerce`] - wire integer flattening, date coercion, type checks
//! - [`cypher`] - property literals, identifiers and regex `WHERE` clauses

pub mod coerce;
pub mod cypher;

pub use coerce::{check_type, flatten_numeric_properties, parse_date, wire_integer};
pub use cypher::{identifier, literal, to_query_props, to_regex_query, Combinator};
