//! Stage Trait: one contract for every lifecycle stage that acts on a stored policy
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::StageContext;
use crate::data_model::PolicyDocument;
use crate::error::Result;

/// The four lifecycle stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Translation,
    Resolution,
    Activation,
    Assurance,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Translation,
        StageKind::Resolution,
        StageKind::Activation,
        StageKind::Assurance,
    ];

    /// Short verb used as the console prefix (`[resolve] ...`).
    pub fn verb(&self) -> &'static str {
        match self {
            StageKind::Translation => "translate",
            StageKind::Resolution => "resolve",
            StageKind::Activation => "activate",
            StageKind::Assurance => "assure",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StageKind::Translation => write!(f, "translation"),
            StageKind::Resolution => write!(f, "resolution"),
            StageKind::Activation => write!(f, "activation"),
            StageKind::Assurance => write!(f, "assurance"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl StageState {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageState::Completed)
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StageState::Pending => write!(f, "pending"),
            StageState::Completed => write!(f, "completed"),
            StageState::Failed => write!(f, "failed"),
        }
    }
}

/// A problem found while running a stage against one subject (rule, device, check).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub stage: StageKind,
    pub subject: String,
    pub message: String,
}

impl Issue {
    pub fn new(stage: StageKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Render issues into the text lines stored in a stage's `*_details`.
pub fn render_issues(issues: &[Issue]) -> Vec<String> {
    issues.iter().map(ToString::to_string).collect()
}

/// Outcome of one stage as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub state: StageState,
    pub details: Vec<String>,
}

impl StageOutcome {
    pub fn from_document(stage: StageKind, policy: &PolicyDocument) -> Self {
        Self {
            stage,
            state: policy.status.state(stage),
            details: policy.status.details(stage).to_vec(),
        }
    }
}

/// Contract of a stage that reads a policy and writes back only its own status fields.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Apply the stage to `policy` and return the updated document.
    ///
    /// Per-subject failures are recorded in the document; only failures that
    /// make the whole stage meaningless are returned as errors.
    async fn run(&self, policy: PolicyDocument, ctx: &StageContext) -> Result<PolicyDocument>;
}
