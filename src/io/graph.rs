//! Read/write graph JSON files.
//!
//! A graph file is the portable representation of a project:
//! - databases of process and elementary-flow nodes with their exchanges
//! - impact methods with characterization factors per elementary flow
//!
//! Permanent scenario runs write the mutated graph back through `write_graph_json`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ExchangeKind, NodeKey, NodeKind};
use crate::error::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub databases: Vec<DatabaseFile>,
    #[serde(default)]
    pub methods: Vec<MethodFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseFile {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFile {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exchanges: Vec<ExchangeFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeFile {
    pub input: NodeKey,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: ExchangeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodFile {
    pub name: Vec<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub factors: Vec<FactorFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorFile {
    pub flow: NodeKey,
    pub factor: f64,
}

/// Read a graph JSON file.
pub fn read_graph_json(path: &Path) -> Result<GraphFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open graph JSON '{}': {e}", path.display())))?;
    let graph: GraphFile = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid graph JSON '{}': {e}", path.display())))?;
    Ok(graph)
}

/// Write a graph JSON file.
pub fn write_graph_json(path: &Path, graph: &GraphFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create graph JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), graph)
        .map_err(|e| AppError::new(2, format!("Failed to write graph JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_json_uses_type_field_for_exchange_kind() {
        let json = r#"{
            "databases": [{
                "name": "db",
                "nodes": [{
                    "code": "a",
                    "name": "widget production",
                    "unit": "kilogram",
                    "exchanges": [
                        {"input": {"database": "db", "code": "a"}, "amount": 1.0, "type": "production"},
                        {"input": {"database": "bio", "code": "co2"}, "amount": 2.5, "type": "biosphere"}
                    ]
                }]
            }],
            "methods": []
        }"#;

        let graph: GraphFile = serde_json::from_str(json).unwrap();
        let node = &graph.databases[0].nodes[0];
        assert_eq!(node.kind, NodeKind::Process);
        assert_eq!(node.exchanges[1].kind, ExchangeKind::Biosphere);
        assert_eq!(node.exchanges[1].input, NodeKey::new("bio", "co2"));
    }

    #[test]
    fn graph_json_file_round_trip_keeps_amounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let graph = GraphFile {
            databases: vec![DatabaseFile {
                name: "db".into(),
                nodes: vec![NodeFile {
                    code: "a".into(),
                    name: "a".into(),
                    kind: NodeKind::Process,
                    reference_product: None,
                    location: Some("GLO".into()),
                    unit: "unit".into(),
                    categories: vec![],
                    exchanges: vec![ExchangeFile {
                        input: NodeKey::new("bio", "x"),
                        amount: 0.1 + 0.2,
                        kind: ExchangeKind::Biosphere,
                    }],
                }],
            }],
            methods: vec![],
        };

        write_graph_json(&path, &graph).unwrap();
        let back = read_graph_json(&path).unwrap();
        assert_eq!(back.databases[0].nodes[0].exchanges[0].amount, 0.1 + 0.2);
        assert_eq!(back.databases[0].nodes[0].location.as_deref(), Some("GLO"));
    }
}
