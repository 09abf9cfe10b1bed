//! Execution Context: read-only inputs shared by every stage of a run
use std::sync::Arc;

use crate::inventory::InventorySnapshot;
use crate::topology::TopologyContext;

#[derive(Debug, Clone)]
pub struct StageContext {
    pub inventory: Arc<InventorySnapshot>,
    pub topology: Option<Arc<TopologyContext>>,
    /// Controller address, substituted for placeholder console hosts.
    pub controller_host: String,
    pub trace_id: String,
}

impl StageContext {
    pub fn new(inventory: InventorySnapshot, controller_host: impl Into<String>) -> Self {
        Self {
            inventory: Arc::new(inventory),
            topology: None,
            controller_host: controller_host.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_topology(mut self, topology: TopologyContext) -> Self {
        self.topology = Some(Arc::new(topology));
        self
    }

    pub fn topology(&self) -> Option<&TopologyContext> {
        self.topology.as_deref()
    }
}
