//! Console address resolution for inventory nodes.
use std::fmt;

use ibn_core::InventoryNode;

/// Hosts the controller reports from its own vantage point.
const PLACEHOLDER_HOSTS: [&str; 3] = ["0.0.0.0", "127.0.0.1", ""];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleTarget {
    pub device: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    MissingPort,
}

impl ConsoleTarget {
    /// Resolve where to reach `node`'s console.
    ///
    /// Missing or placeholder hosts fall back to `controller_host`.
    pub fn resolve(node: &InventoryNode, controller_host: &str) -> Result<Self, TargetError> {
        let host = match node.console_host.as_deref().map(str::trim) {
            Some(host) if !PLACEHOLDER_HOSTS.contains(&host) => host.to_string(),
            _ => controller_host.to_string(),
        };
        let port = node.console_port.ok_or(TargetError::MissingPort)?;
        Ok(Self {
            device: node.name.clone(),
            host,
            port,
        })
    }
}

impl fmt::Display for ConsoleTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}:{})", self.device, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(host: Option<&str>, port: Option<u16>) -> InventoryNode {
        InventoryNode {
            name: "FW-1".to_string(),
            console_host: host.map(str::to_string),
            console_port: port,
            ..Default::default()
        }
    }

    #[test]
    fn test_placeholder_hosts_substituted() {
        for host in [Some("0.0.0.0"), Some("127.0.0.1"), Some(""), None] {
            let target = ConsoleTarget::resolve(&node(host, Some(5000)), "192.0.2.1").unwrap();
            assert_eq!(target.host, "192.0.2.1", "host {:?}", host);
            assert_eq!(target.port, 5000);
        }
    }

    #[test]
    fn test_real_host_kept() {
        let target = ConsoleTarget::resolve(&node(Some("192.0.2.5"), Some(5000)), "192.0.2.1").unwrap();
        assert_eq!(target.host, "192.0.2.5");
        assert_eq!(target.to_string(), "FW-1 (192.0.2.5:5000)");
    }

    #[test]
    fn test_missing_port() {
        assert_eq!(
            ConsoleTarget::resolve(&node(Some("192.0.2.5"), None), "192.0.2.1"),
            Err(TargetError::MissingPort)
        );
    }
}
