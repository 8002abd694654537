//! Query Statements
//!
//! Every query string the mapping layer sends is built here. The current
//! node is always bound to `n` (single-label statements) or `a` (edge
//! statements); the other end of an edge is `b` and the edge itself `r`.

use crate::models::{Direction, Properties};
use crate::utils::{identifier, to_query_props};

/// Lists existing constraints; an empty result allows provisioning.
pub const LIST_CONSTRAINTS: &str = "CALL db.constraints()";

pub fn create_unique_constraint(label: &str, property: &str) -> String {
    format!(
        "CREATE CONSTRAINT ON (n:{}) ASSERT n.{} IS UNIQUE",
        identifier(label),
        identifier(property)
    )
}

pub fn create_index(label: &str, properties: &[String]) -> String {
    let columns: Vec<String> = properties.iter().map(|p| identifier(p)).collect();
    format!("CREATE INDEX ON :{}({})", identifier(label), columns.join(","))
}

pub fn create_node(label: &str, properties: &Properties) -> String {
    format!(
        "CREATE (n:{} {}) RETURN n",
        identifier(label),
        to_query_props(properties)
    )
}

/// Replace the whole property set of an existing node.
pub fn update_node(label: &str, id: i64, properties: &Properties) -> String {
    format!(
        "MATCH (n:{}) WHERE ID(n) = {} SET n = {} RETURN n",
        identifier(label),
        id,
        to_query_props(properties)
    )
}

fn match_pattern(label: &str, matching: &Properties) -> String {
    if matching.is_empty() {
        format!("MATCH (n:{})", identifier(label))
    } else {
        format!("MATCH (n:{} {})", identifier(label), to_query_props(matching))
    }
}

/// Find nodes by property equality plus an optional `WHERE` clause.
///
/// `limit` of `None` or `Some(0)` leaves the result unbounded.
pub fn find_nodes(label: &str, matching: &Properties, where_clause: &str, limit: Option<usize>) -> String {
    let mut query = match_pattern(label, matching);
    if !where_clause.is_empty() {
        query.push(' ');
        query.push_str(where_clause);
    }
    query.push_str(" RETURN n");
    if let Some(limit) = limit.filter(|l| *l > 0) {
        query.push_str(&format!(" LIMIT {}", limit));
    }
    query
}

pub fn find_node_by_id(label: &str, id: i64) -> String {
    format!("MATCH (n:{}) WHERE ID(n) = {} RETURN n", identifier(label), id)
}

pub fn delete_matching(label: &str, matching: &Properties) -> String {
    format!("{} DETACH DELETE n", match_pattern(label, matching))
}

pub fn delete_all(label: &str) -> String {
    format!("MATCH (n:{}) DETACH DELETE n", identifier(label))
}

fn edge(relation: &str, direction: Direction) -> String {
    let rel = identifier(relation);
    match direction {
        Direction::Out => format!("-[r:{}]->", rel),
        Direction::In => format!("<-[r:{}]-", rel),
        Direction::Any => format!("-[r:{}]-", rel),
    }
}

fn other_end(label: Option<&str>, matching: &Properties) -> String {
    let label = label.map(|l| format!(":{}", identifier(l))).unwrap_or_default();
    if matching.is_empty() {
        format!("(b{})", label)
    } else {
        format!("(b{} {})", label, to_query_props(matching))
    }
}

pub fn create_relationship(
    label: &str,
    id: i64,
    relation: &str,
    other_label: &str,
    other_id: i64,
    properties: &Properties,
) -> String {
    format!(
        "MATCH (a:{}),(b:{}) WHERE ID(a) = {} AND ID(b) = {} CREATE (a)-[r:{} {}]->(b) RETURN r",
        identifier(label),
        identifier(other_label),
        id,
        other_id,
        identifier(relation),
        to_query_props(properties)
    )
}

/// Every `(r, b)` pair reachable from node `id` over `relation`.
pub fn related(label: &str, id: i64, relation: &str, other_label: &str, direction: Direction) -> String {
    format!(
        "MATCH (a:{}){}(b:{}) WHERE ID(a) = {} RETURN r, b",
        identifier(label),
        edge(relation, direction),
        identifier(other_label),
        id
    )
}

/// The `(r, b)` pair between node `id` and node `other_id`, if any.
pub fn related_to(
    label: &str,
    id: i64,
    relation: &str,
    other_label: &str,
    other_id: i64,
    direction: Direction,
) -> String {
    format!(
        "MATCH (a:{}){}(b:{}) WHERE ID(a) = {} AND ID(b) = {} RETURN r, b LIMIT 1",
        identifier(label),
        edge(relation, direction),
        identifier(other_label),
        id,
        other_id
    )
}

/// Existence probe for an edge to any node matching `matching`.
pub fn relation_exists(
    label: &str,
    id: i64,
    relation: &str,
    matching: &Properties,
    direction: Direction,
) -> String {
    format!(
        "MATCH (a:{}){}{} WHERE ID(a) = {} RETURN ID(r) LIMIT 1",
        identifier(label),
        edge(relation, direction),
        other_end(None, matching),
        id
    )
}

/// Existence probe for an edge to one specific node.
pub fn relation_exists_with(
    label: &str,
    id: i64,
    relation: &str,
    other_label: &str,
    other_id: i64,
    direction: Direction,
) -> String {
    format!(
        "MATCH (a:{}){}(b:{}) WHERE ID(a) = {} AND ID(b) = {} RETURN ID(r) LIMIT 1",
        identifier(label),
        edge(relation, direction),
        identifier(other_label),
        id,
        other_id
    )
}

/// Replace the property set of outgoing `relation` edges to nodes matching
/// `matching`.
pub fn update_relation(label: &str, id: i64, relation: &str, matching: &Properties, properties: &Properties) -> String {
    format!(
        "MATCH (a:{}){}{} WHERE ID(a) = {} SET r = {} RETURN r",
        identifier(label),
        edge(relation, Direction::Out),
        other_end(None, matching),
        id,
        to_query_props(properties)
    )
}

pub fn update_relation_by_id(label: &str, id: i64, relation: &str, other_id: i64, properties: &Properties) -> String {
    format!(
        "MATCH (a:{}){}(b) WHERE ID(a) = {} AND ID(b) = {} SET r = {} RETURN r",
        identifier(label),
        edge(relation, Direction::Out),
        id,
        other_id,
        to_query_props(properties)
    )
}

/// Delete `relation` edges between two nodes, whichever way they point.
pub fn delete_relation(label: &str, id: i64, relation: &str, other_label: &str, other_id: i64) -> String {
    format!(
        "MATCH (a:{}){}(b:{}) WHERE ID(a) = {} AND ID(b) = {} DELETE r",
        identifier(label),
        edge(relation, Direction::Any),
        identifier(other_label),
        id,
        other_id
    )
}
