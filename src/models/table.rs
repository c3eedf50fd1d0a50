use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One index belonging to a table, as reported by the engine catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    /// DDL that recreates the index
    pub sql: String,
}

/// A foreign-key edge from one table to another.
///
/// Only used while building the dependency graph; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyEdge {
    pub referenced_table: String,
    pub local_column: String,
    pub referenced_column: String,
}

/// Schema description of one user table.
///
/// `columns` defines both the export column order and the positional bind
/// order on restore, so it must match the order declared in the table DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    /// DDL that recreates the table
    pub sql: String,
    pub indexes: Vec<IndexDescriptor>,
    pub columns: Vec<String>,
    /// Foreign-key edges, populated by introspection and consumed by the
    /// dependency resolver; stripped before the descriptor is persisted
    #[serde(skip)]
    pub constraints: Vec<ForeignKeyEdge>,
}

/// The persisted control document for one backup instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Table names ordered so that no table precedes a table it depends on
    #[serde(rename = "loadOrder")]
    pub load_order: Vec<String>,
    pub tables: BTreeMap<String, TableDescriptor>,
}

/// Combine a resolved load order and the introspected table mapping into one
/// metadata document, stripping the graph-only constraint edges.
///
/// Pure function; no I/O.
pub fn build_metadata(
    load_order: Vec<String>,
    tables: BTreeMap<String, TableDescriptor>,
) -> BackupMetadata {
    let tables = tables
        .into_iter()
        .map(|(name, mut descriptor)| {
            descriptor.constraints.clear();
            (name, descriptor)
        })
        .collect();

    BackupMetadata { load_order, tables }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, referenced: &[&str]) -> TableDescriptor {
        TableDescriptor {
            name: name.to_string(),
            sql: format!("CREATE TABLE {name} (id INTEGER PRIMARY KEY)"),
            indexes: vec![],
            columns: vec!["id".to_string()],
            constraints: referenced
                .iter()
                .map(|r| ForeignKeyEdge {
                    referenced_table: r.to_string(),
                    local_column: "id".to_string(),
                    referenced_column: "id".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_build_metadata_strips_constraints() {
        let mut tables = BTreeMap::new();
        tables.insert("A".to_string(), descriptor("A", &["B"]));
        tables.insert("B".to_string(), descriptor("B", &[]));

        let metadata = build_metadata(vec!["B".to_string(), "A".to_string()], tables);

        assert_eq!(metadata.load_order, vec!["B", "A"]);
        assert!(metadata.tables["A"].constraints.is_empty());
    }

    #[test]
    fn test_metadata_json_shape() {
        let mut tables = BTreeMap::new();
        tables.insert("Customers".to_string(), descriptor("Customers", &[]));
        let metadata = build_metadata(vec!["Customers".to_string()], tables);

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["loadOrder"][0], "Customers");
        assert_eq!(json["tables"]["Customers"]["name"], "Customers");
        assert!(json["tables"]["Customers"]["columns"].is_array());
        // Graph-only fields never reach the wire
        assert!(json["tables"]["Customers"].get("constraints").is_none());
    }
}
