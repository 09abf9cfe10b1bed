//! Data Model: PolicyDocument and its rule/step/check records
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{IbnError, Result};
use crate::stage::{StageKind, StageState};

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A persisted network policy, keyed by `policy_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default, deserialize_with = "nullable")]
    pub policy_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub intent: Intent,
    #[serde(default, deserialize_with = "nullable")]
    pub policy_rules: Vec<PolicyRule>,
    #[serde(default, deserialize_with = "nullable")]
    pub enforcement_steps: Vec<EnforcementStep>,
    #[serde(default, deserialize_with = "nullable")]
    pub validation_checks: Vec<ValidationCheck>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: PolicyStatus,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub activation_logs: Vec<ActivationLog>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub assurance_results: Vec<AssuranceResult>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: String,
    /// Store-managed write counter used for compare-and-swap saves.
    #[serde(default)]
    pub revision: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default, deserialize_with = "nullable")]
    pub raw: String,
    #[serde(default, deserialize_with = "nullable")]
    pub summary: String,
    #[serde(default, deserialize_with = "nullable")]
    pub assumptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    #[serde(default, deserialize_with = "nullable")]
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Device, subnet or group names; may carry a `group:`/`subnet:` prefix.
    #[serde(default, deserialize_with = "nullable")]
    pub targets: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub action: String,
    #[serde(default, deserialize_with = "nullable")]
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnforcementStep {
    #[serde(default, deserialize_with = "nullable")]
    pub step: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub device: String,
    /// Delivery channel, `telnet` or `api`
    #[serde(default, deserialize_with = "nullable")]
    pub method: String,
    #[serde(default, deserialize_with = "nullable")]
    pub commands: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    #[serde(default, deserialize_with = "nullable")]
    pub check_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub source_device: String,
    #[serde(default, deserialize_with = "nullable")]
    pub commands: Vec<String>,
    /// Substring that must appear in the joined command output.
    #[serde(default, deserialize_with = "nullable")]
    pub success_criteria: String,
}

/// Per-stage state plus the human-readable details for each stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatus {
    #[serde(default)]
    pub translation: StageState,
    #[serde(default)]
    pub resolution: StageState,
    #[serde(default)]
    pub activation: StageState,
    #[serde(default)]
    pub assurance: StageState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translation_details: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolution_details: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activation_details: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assurance_details: Vec<String>,
    /// RFC 3339 timestamp of the last translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl PolicyStatus {
    pub fn state(&self, stage: StageKind) -> StageState {
        match stage {
            StageKind::Translation => self.translation,
            StageKind::Resolution => self.resolution,
            StageKind::Activation => self.activation,
            StageKind::Assurance => self.assurance,
        }
    }

    pub fn details(&self, stage: StageKind) -> &[String] {
        match stage {
            StageKind::Translation => &self.translation_details,
            StageKind::Resolution => &self.resolution_details,
            StageKind::Activation => &self.activation_details,
            StageKind::Assurance => &self.assurance_details,
        }
    }

    /// Overwrite one stage's state and details; other stages are untouched.
    pub fn record(&mut self, stage: StageKind, state: StageState, details: Vec<String>) {
        let (slot, slot_details) = match stage {
            StageKind::Translation => (&mut self.translation, &mut self.translation_details),
            StageKind::Resolution => (&mut self.resolution, &mut self.resolution_details),
            StageKind::Activation => (&mut self.activation, &mut self.activation_details),
            StageKind::Assurance => (&mut self.assurance, &mut self.assurance_details),
        };
        *slot = state;
        *slot_details = details;
    }
}

/// Transcript of one enforcement step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationLog {
    pub device: String,
    pub commands: Vec<String>,
    /// One entry per command, in command order
    pub output: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssuranceResult {
    pub check_id: String,
    pub source_device: String,
    pub commands: Vec<String>,
    pub output: Vec<String>,
    pub success: bool,
    pub criteria: String,
}

impl PolicyDocument {
    pub fn new(policy_id: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            ..Default::default()
        }
    }

    /// Parse a document from YAML or JSON text and validate it.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let doc: PolicyDocument = serde_yaml::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Structural checks applied whenever a document is loaded.
    pub fn validate(&self) -> Result<()> {
        if self.policy_id.trim().is_empty() {
            return Err(IbnError::Validation("policy_id must not be empty".to_string()));
        }
        if self.policy_id.trim() != self.policy_id {
            return Err(IbnError::Validation(format!(
                "policy_id '{}' has surrounding whitespace",
                self.policy_id
            )));
        }
        Ok(())
    }

    pub fn state(&self, stage: StageKind) -> StageState {
        self.status.state(stage)
    }
}
