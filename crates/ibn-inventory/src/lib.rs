//! IBN Inventory: topology documents, controller reads and inventory snapshots
//!
//! ```text
//! topology.yaml ──► TopologyContext ──┐
//!                                     ├──► build_inventory ──► gns3_inventory.json
//! controller /v2 ──► projects/nodes ──┘
//! ```

pub mod builder;
pub mod controller;
pub mod topology;

pub use builder::{build_inventory, load_inventory, refresh_inventory, save_inventory};
pub use controller::{ControllerClient, ControllerNode, ControllerProject, TopologyController};
pub use topology::{load_topology, parse_topology};
