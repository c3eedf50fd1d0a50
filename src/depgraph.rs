//! Table-dependency resolution.
//!
//! Foreign-key edges are lifted out of the descriptors into an explicit
//! adjacency map (table name -> set of dependency names); traversal state
//! lives entirely in this module and never touches the descriptors.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AppError, Result};
use crate::models::TableDescriptor;

/// Compute a load order in which every table appears after all tables it
/// depends on via foreign keys.
///
/// Depth-first post-order over the constraint graph; each table is emitted
/// exactly once no matter how many paths reach it. Self-references impose no
/// ordering constraint. A dependency cycle fails with
/// [`AppError::CyclicDependency`] naming a table on the cycle.
pub fn resolve_load_order(tables: &BTreeMap<String, TableDescriptor>) -> Result<Vec<String>> {
    let graph: BTreeMap<&str, BTreeSet<&str>> = tables
        .iter()
        .map(|(name, descriptor)| {
            let dependencies = descriptor
                .constraints
                .iter()
                .map(|edge| edge.referenced_table.as_str())
                .filter(|referenced| *referenced != name.as_str())
                .filter(|referenced| tables.contains_key(*referenced))
                .collect();
            (name.as_str(), dependencies)
        })
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    let mut visited = BTreeSet::new();
    let mut on_path = BTreeSet::new();

    for &name in graph.keys() {
        visit(name, &graph, &mut visited, &mut on_path, &mut order)?;
    }

    Ok(order)
}

fn visit<'a>(
    name: &'a str,
    graph: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    visited: &mut BTreeSet<&'a str>,
    on_path: &mut BTreeSet<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    if visited.contains(name) {
        return Ok(());
    }
    if !on_path.insert(name) {
        return Err(AppError::CyclicDependency(name.to_string()));
    }

    if let Some(dependencies) = graph.get(name) {
        for &dependency in dependencies {
            visit(dependency, graph, visited, on_path, order)?;
        }
    }

    on_path.remove(name);
    visited.insert(name);
    order.push(name.to_string());

    Ok(())
}
