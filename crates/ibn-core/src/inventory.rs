//! Inventory snapshot: point-in-time dump of live devices and links.
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub topology_name: String,
    pub project_id: String,
    #[serde(default)]
    pub project_path: Option<String>,
    #[serde(default)]
    pub nodes: Vec<InventoryNode>,
    /// Raw controller link records
    #[serde(default)]
    pub links: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryNode {
    #[serde(default)]
    pub node_id: String,
    pub name: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub console_host: Option<String>,
    #[serde(default)]
    pub console_port: Option<u16>,
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub interfaces: Vec<Value>,
    /// Raw detail blob, or `{"error": ...}` when the detail fetch was tolerated.
    #[serde(default)]
    pub detail: Value,
}

fn unknown_status() -> String {
    "unknown".to_string()
}

impl InventorySnapshot {
    /// Look up a node by exact name.
    pub fn node(&self, name: &str) -> Option<&InventoryNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        let snapshot = InventorySnapshot {
            topology_name: "lab".to_string(),
            project_id: "p1".to_string(),
            nodes: vec![InventoryNode {
                name: "FW-1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(snapshot.contains("FW-1"));
        assert!(!snapshot.contains("fw-1"));
    }

    #[test]
    fn test_missing_fields_default() {
        let node: InventoryNode = serde_json::from_str(r#"{"name": "R1"}"#).unwrap();
        assert_eq!(node.status, "unknown");
        assert!(node.console_port.is_none());
        assert!(node.interfaces.is_empty());
    }
}
