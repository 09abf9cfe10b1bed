//! IBN Policy: persistence and reference resolution for policy documents
//!
//! # Example
//!
//! ```no_run
//! use ibn_policy::{resolve, PolicyStore};
//! use ibn_core::InventorySnapshot;
//!
//! let store = PolicyStore::open("policies/ibn_policies.yaml")?;
//! let inventory = InventorySnapshot::default();
//!
//! let policy = store.require("policy-20250101120000-a1b2c3")?;
//! let resolved = resolve(policy, &inventory, None);
//! store.upsert(resolved)?;
//! # Ok::<(), ibn_core::IbnError>(())
//! ```

pub mod resolver;
pub mod store;

pub use resolver::{apply_resolution, find_issues, normalize, resolve, KnownTargets, RESOLVED_NOTE};
pub use store::{PolicyFile, PolicyStore};
