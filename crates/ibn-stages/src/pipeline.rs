//! Pipeline Orchestrator: Resolve → Activate → Assure, halting on the first
//! stage that does not complete.
use std::sync::Arc;

use ibn_console::ConsoleConnector;
use ibn_core::{Result, Stage, StageContext, StageKind, StageOutcome};
use ibn_policy::PolicyStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::activation::ActivationStage;
use crate::assurance::AssuranceStage;
use crate::resolution::ResolutionStage;
use crate::runner::run_stage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    #[serde(default)]
    pub skip_activation: bool,
    #[serde(default)]
    pub skip_assurance: bool,
}

impl PipelineOptions {
    /// Skipping activation also skips assurance; there is nothing to verify.
    pub fn skips(&self, stage: StageKind) -> bool {
        match stage {
            StageKind::Activation => self.skip_activation,
            StageKind::Assurance => self.skip_assurance || self.skip_activation,
            _ => false,
        }
    }
}

/// What happened to one policy during a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub policy_id: String,
    /// One entry per stage that ran, in order
    pub outcomes: Vec<StageOutcome>,
    /// Stage whose persisted state was not `completed`
    pub halted_at: Option<StageKind>,
    /// First stage left out on request; the run ended before it
    pub skipped_at: Option<StageKind>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.halted_at.is_none()
    }
}

/// Ordered stages run against one stored policy
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Pipeline { stages: Vec::new() }
    }

    /// Resolution, activation and assurance over `connector`
    pub fn standard(connector: Arc<dyn ConsoleConnector>) -> Self {
        Pipeline::new()
            .add_stage(Box::new(ResolutionStage))
            .add_stage(Box::new(ActivationStage::new(connector.clone())))
            .add_stage(Box::new(AssuranceStage::new(connector)))
    }

    /// Add a stage to the pipeline
    pub fn add_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub async fn run(
        &self,
        policy_id: &str,
        store: &PolicyStore,
        ctx: &StageContext,
        options: PipelineOptions,
    ) -> Result<PipelineReport> {
        self.run_observed(policy_id, store, ctx, options, |_| {}).await
    }

    /// Like [`Pipeline::run`], calling `on_start` just before each stage runs.
    pub async fn run_observed<F>(
        &self,
        policy_id: &str,
        store: &PolicyStore,
        ctx: &StageContext,
        options: PipelineOptions,
        mut on_start: F,
    ) -> Result<PipelineReport>
    where
        F: FnMut(StageKind) + Send,
    {
        let mut report = PipelineReport {
            policy_id: policy_id.to_string(),
            outcomes: Vec::new(),
            halted_at: None,
            skipped_at: None,
        };

        for stage in &self.stages {
            let kind = stage.kind();
            if options.skips(kind) {
                info!(policy_id, stage = %kind, "stage skipped, run ends here");
                report.skipped_at = Some(kind);
                break;
            }

            on_start(kind);
            let policy = run_stage(stage.as_ref(), policy_id, store, ctx).await?;
            let outcome = StageOutcome::from_document(kind, &policy);
            let completed = outcome.state.is_completed();
            report.outcomes.push(outcome);
            if !completed {
                info!(policy_id, stage = %kind, "pipeline halted");
                report.halted_at = Some(kind);
                break;
            }
        }

        Ok(report)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: PipelineOptions = serde_json::from_str("{\"skip_assurance\": true}").unwrap();
        assert!(!options.skips(StageKind::Activation));
        assert!(options.skips(StageKind::Assurance));
        assert!(!options.skips(StageKind::Resolution));
    }

    #[test]
    fn test_skipping_activation_skips_assurance() {
        let options = PipelineOptions {
            skip_activation: true,
            skip_assurance: false,
        };
        assert!(options.skips(StageKind::Activation));
        assert!(options.skips(StageKind::Assurance));
    }
}
