//! Static topology definition: subnets, nodes and device groups.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyContext {
    /// Topology name; also the controller project name.
    #[serde(rename = "topology", default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    #[serde(default)]
    pub groups: Vec<DeviceGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cidr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub name: String,
    /// Free-form attributes (role, interfaces, addresses...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl TopologyContext {
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .map(|n| n.name.as_str())
            .filter(|n| !n.is_empty())
    }

    pub fn group(&self, name: &str) -> Option<&DeviceGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}
