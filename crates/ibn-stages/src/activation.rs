//! Activation stage: push each enforcement step's commands to its device console.
use std::sync::Arc;

use async_trait::async_trait;
use ibn_console::{ConsoleConnector, ConsoleTarget, TargetError};
use ibn_core::{
    render_issues, ActivationLog, IbnError, Issue, PolicyDocument, Result, Stage, StageContext,
    StageKind, StageState,
};
use tracing::{debug, info, warn};

pub const ACTIVATED_NOTE: &str = "Commands executed on all targets";

pub struct ActivationStage {
    connector: Arc<dyn ConsoleConnector>,
}

impl ActivationStage {
    pub fn new(connector: Arc<dyn ConsoleConnector>) -> Self {
        Self { connector }
    }
}

/// Text of a console failure without the device prefix the issue already names.
pub(crate) fn failure_text(err: &IbnError) -> String {
    match err {
        IbnError::DeviceOperation { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Stage for ActivationStage {
    fn kind(&self) -> StageKind {
        StageKind::Activation
    }

    async fn run(&self, mut policy: PolicyDocument, ctx: &StageContext) -> Result<PolicyDocument> {
        let mut transcripts = Vec::new();
        let mut issues = Vec::new();
        let issue = |device: &str, message: String| Issue::new(StageKind::Activation, device, message);

        for step in &policy.enforcement_steps {
            let device = step.device.as_str();
            let Some(node) = ctx.inventory.node(device) else {
                issues.push(issue(device, format!("Device '{}' missing from inventory", device)));
                continue;
            };
            let target = match ConsoleTarget::resolve(node, &ctx.controller_host) {
                Ok(target) => target,
                Err(TargetError::MissingPort) => {
                    issues.push(issue(device, format!("Device '{}' missing console port info", device)));
                    continue;
                }
            };
            if step.commands.is_empty() {
                debug!(step = step.step, device, "no commands, skipping step");
                continue;
            }

            match self.connector.run_batch(&target, &step.commands).await {
                Ok(output) => {
                    debug!(step = step.step, %target, commands = step.commands.len(), "step applied");
                    transcripts.push(ActivationLog {
                        device: device.to_string(),
                        commands: step.commands.clone(),
                        output,
                    });
                }
                Err(e) => issues.push(issue(
                    device,
                    format!("Failed to run commands on {}: {}", device, failure_text(&e)),
                )),
            }
        }

        for issue in &issues {
            warn!(policy_id = %policy.policy_id, subject = %issue.subject, "{}", issue);
        }
        if issues.is_empty() {
            policy
                .status
                .record(StageKind::Activation, StageState::Completed, vec![ACTIVATED_NOTE.to_string()]);
        } else {
            policy
                .status
                .record(StageKind::Activation, StageState::Failed, render_issues(&issues));
        }
        policy.activation_logs = transcripts;

        info!(
            policy_id = %policy.policy_id,
            state = %policy.status.activation,
            logs = policy.activation_logs.len(),
            "activation finished"
        );
        Ok(policy)
    }
}
