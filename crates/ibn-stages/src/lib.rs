//! IBN Stages: the lifecycle stages that act on a stored policy
//!
//! # Pipeline Flow
//!
//! ```text
//! store ─► Resolve ─► Activate ─► Assure
//!            │           │          │
//!         issues    transcripts   results      (each persisted before the next runs)
//! ```

pub mod activation;
pub mod assurance;
pub mod pipeline;
pub mod resolution;
pub mod runner;

pub use activation::{ActivationStage, ACTIVATED_NOTE};
pub use assurance::{criteria_met, AssuranceStage, ASSURED_NOTE};
pub use pipeline::{Pipeline, PipelineOptions, PipelineReport};
pub use resolution::ResolutionStage;
pub use runner::{activate_policy, assure_policy, resolve_policy, run_stage};
