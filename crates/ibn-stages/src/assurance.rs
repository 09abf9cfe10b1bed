//! Assurance stage: replay validation checks and match their output.
use std::sync::Arc;

use async_trait::async_trait;
use ibn_console::{ConsoleConnector, ConsoleTarget};
use ibn_core::{
    render_issues, AssuranceResult, Issue, PolicyDocument, Result, Stage, StageContext, StageKind,
    StageState,
};
use tracing::{debug, info, warn};

use crate::activation::failure_text;

pub const ASSURED_NOTE: &str = "All validation checks passed";

pub struct AssuranceStage {
    connector: Arc<dyn ConsoleConnector>,
}

impl AssuranceStage {
    pub fn new(connector: Arc<dyn ConsoleConnector>) -> Self {
        Self { connector }
    }
}

/// Non-empty criteria must appear in the output; empty criteria need any output at all.
pub fn criteria_met(criteria: &str, output: &str) -> bool {
    if criteria.is_empty() {
        !output.is_empty()
    } else {
        output.contains(criteria)
    }
}

#[async_trait]
impl Stage for AssuranceStage {
    fn kind(&self) -> StageKind {
        StageKind::Assurance
    }

    async fn run(&self, mut policy: PolicyDocument, ctx: &StageContext) -> Result<PolicyDocument> {
        let mut results = Vec::new();
        let mut issues = Vec::new();

        for check in &policy.validation_checks {
            let id = check.check_id.as_str();
            let issue = |message: String| Issue::new(StageKind::Assurance, id, message);

            let Some(node) = ctx.inventory.node(&check.source_device) else {
                issues.push(issue(format!(
                    "Validation check {} cannot find device '{}'",
                    id, check.source_device
                )));
                continue;
            };
            let target = match ConsoleTarget::resolve(node, &ctx.controller_host) {
                Ok(target) if !check.commands.is_empty() => target,
                _ => {
                    issues.push(issue(format!("Validation check {} missing port/commands", id)));
                    continue;
                }
            };

            let output = match self.connector.run_batch(&target, &check.commands).await {
                Ok(output) => output,
                Err(e) => {
                    issues.push(issue(format!("Validation check {} failed: {}", id, failure_text(&e))));
                    continue;
                }
            };

            let criteria = check.success_criteria.trim();
            let success = criteria_met(criteria, &output.join("\n"));
            debug!(check = id, %target, success, "check evaluated");
            if !success {
                issues.push(issue(format!(
                    "Validation check {} did not meet criteria '{}'",
                    id, criteria
                )));
            }
            results.push(AssuranceResult {
                check_id: check.check_id.clone(),
                source_device: check.source_device.clone(),
                commands: check.commands.clone(),
                output,
                success,
                criteria: criteria.to_string(),
            });
        }

        for issue in &issues {
            warn!(policy_id = %policy.policy_id, subject = %issue.subject, "{}", issue);
        }
        if issues.is_empty() {
            policy
                .status
                .record(StageKind::Assurance, StageState::Completed, vec![ASSURED_NOTE.to_string()]);
        } else {
            policy
                .status
                .record(StageKind::Assurance, StageState::Failed, render_issues(&issues));
        }
        policy.assurance_results = results;

        info!(
            policy_id = %policy.policy_id,
            state = %policy.status.assurance,
            checks = policy.assurance_results.len(),
            "assurance finished"
        );
        Ok(policy)
    }
}
