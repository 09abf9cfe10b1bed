//! Inventory builder: one wholesale snapshot per refresh.
use std::fs;
use std::path::Path;

use ibn_core::{IbnError, InventoryNode, InventorySnapshot, Result, TopologyContext};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::controller::{ControllerNode, TopologyController};

/// Query the controller for the project named after `topology` and build a snapshot.
///
/// Node details are fetched one node at a time. A 404 on a single node's
/// detail is recorded on that node and does not abort the build.
pub async fn build_inventory<C>(
    controller: &C,
    topology: &TopologyContext,
    controller_host: &str,
) -> Result<InventorySnapshot>
where
    C: TopologyController + ?Sized,
{
    let project = controller
        .find_project(&topology.name)
        .await?
        .ok_or_else(|| IbnError::not_found("controller project", &topology.name))?;

    let nodes = controller.project_nodes(&project.project_id).await?;
    let links = controller.project_links(&project.project_id).await?;

    let mut inventory_nodes = Vec::with_capacity(nodes.len());
    for node in nodes {
        let detail = match controller.node_detail(&project.project_id, &node.node_id).await {
            Ok(detail) => detail,
            Err(err) if err.is_controller_not_found() => {
                warn!(node = %node.name, error = %err, "node detail unavailable");
                json!({ "error": err.to_string() })
            }
            Err(err) => return Err(err),
        };
        inventory_nodes.push(inventory_node(node, detail, controller_host));
    }

    info!(
        project = %project.name,
        nodes = inventory_nodes.len(),
        links = links.len(),
        "inventory built"
    );

    Ok(InventorySnapshot {
        topology_name: topology.name.clone(),
        project_id: project.project_id,
        project_path: project.path,
        nodes: inventory_nodes,
        links,
    })
}

fn non_empty_array<'a>(detail: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    detail.get(key).and_then(Value::as_array).filter(|a| !a.is_empty())
}

fn inventory_node(node: ControllerNode, detail: Value, controller_host: &str) -> InventoryNode {
    let interfaces = if detail.get("error").is_some() {
        Vec::new()
    } else {
        non_empty_array(&detail, "ports")
            .or_else(|| non_empty_array(&detail, "interfaces"))
            .cloned()
            .unwrap_or_default()
    };

    let console_host = node
        .console_host
        .filter(|h| !h.is_empty())
        .or_else(|| {
            detail
                .get("console_host")
                .and_then(Value::as_str)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| controller_host.to_string());

    let console_port = node.console_port.or_else(|| {
        detail
            .get("console")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
    });

    InventoryNode {
        node_id: node.node_id,
        name: node.name,
        node_type: node.node_type,
        console_host: Some(console_host),
        console_port,
        status: node.status,
        properties: node.properties,
        interfaces,
        detail,
    }
}

/// Write the snapshot as pretty JSON, replacing any previous snapshot.
pub fn save_inventory(snapshot: &InventorySnapshot, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
    Ok(())
}

pub fn load_inventory(path: impl AsRef<Path>) -> Result<InventorySnapshot> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IbnError::not_found(
            "inventory file (run with --refresh-inventory)",
            path.display().to_string(),
        ),
        _ => IbnError::Io(e),
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Build a fresh snapshot and persist it to `path`.
pub async fn refresh_inventory<C>(
    controller: &C,
    topology: &TopologyContext,
    controller_host: &str,
    path: impl AsRef<Path>,
) -> Result<InventorySnapshot>
where
    C: TopologyController + ?Sized,
{
    let snapshot = build_inventory(controller, topology, controller_host).await?;
    save_inventory(&snapshot, path.as_ref())?;
    info!(path = %path.as_ref().display(), "inventory saved");
    Ok(snapshot)
}
