//! IBN Core: data model, stage contract, errors and settings
//!
//! Shared vocabulary for the Translate → Resolve → Activate → Assure lifecycle.

pub mod config;
pub mod context;
pub mod data_model;
pub mod error;
pub mod inventory;
pub mod stage;
pub mod topology;

pub use config::{ControllerConfig, LlmConfig, Paths, Settings};
pub use context::StageContext;
pub use data_model::{
    ActivationLog, AssuranceResult, EnforcementStep, Intent, PolicyDocument, PolicyRule,
    PolicyStatus, ValidationCheck,
};
pub use error::{IbnError, Result};
pub use inventory::{InventoryNode, InventorySnapshot};
pub use stage::{render_issues, Issue, Stage, StageKind, StageOutcome, StageState};
pub use topology::{DeviceGroup, Subnet, TopologyContext, TopologyNode};
