//! Static topology definition loading.
use std::fs;
use std::path::Path;

use ibn_core::{IbnError, Result, TopologyContext};

/// Parse a topology document from YAML text.
pub fn parse_topology(yaml: &str) -> Result<TopologyContext> {
    if yaml.trim().is_empty() {
        return Err(IbnError::Validation("topology document is empty".to_string()));
    }
    let topology: TopologyContext = serde_yaml::from_str(yaml)?;
    Ok(topology)
}

/// Load the topology definition file.
pub fn load_topology(path: impl AsRef<Path>) -> Result<TopologyContext> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IbnError::not_found("topology file", path.display().to_string()),
        _ => IbnError::Io(e),
    })?;
    parse_topology(&text).map_err(|e| match e {
        IbnError::Validation(msg) => IbnError::Validation(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPOLOGY: &str = r#"
topology: branch-lab
description: Two LANs behind one firewall
subnets:
  - name: LAN-A
    cidr: 10.0.1.0/24
  - name: LAN-B
    cidr: 10.0.2.0/24
nodes:
  - name: FW-1
    role: firewall
    interfaces: [eth0, eth1]
  - name: R1
    role: router
groups:
  - name: edge
    members: [FW-1, R1]
"#;

    #[test]
    fn test_parse_topology() {
        let topology = parse_topology(TOPOLOGY).unwrap();
        assert_eq!(topology.name, "branch-lab");
        assert_eq!(topology.subnets.len(), 2);
        assert_eq!(topology.subnets[1].cidr, "10.0.2.0/24");
        assert_eq!(topology.nodes[0].attributes["role"], "firewall");
        assert_eq!(topology.group("edge").unwrap().members.len(), 2);
        assert_eq!(topology.node_names().collect::<Vec<_>>(), vec!["FW-1", "R1"]);
    }

    #[test]
    fn test_empty_topology_is_error() {
        assert!(matches!(parse_topology("  \n"), Err(IbnError::Validation(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_topology(dir.path().join("topology.yaml")).unwrap_err();
        assert!(matches!(err, IbnError::NotFound { .. }));
    }
}
