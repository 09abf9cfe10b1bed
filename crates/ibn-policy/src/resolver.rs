//! Policy resolution: cross-check every reference in a policy against the
//! current inventory and topology.
//!
//! Resolution is pure. It never talks to devices or the controller; the caller
//! decides where the updated document is persisted.

use std::collections::HashSet;

use ibn_core::{
    render_issues, InventorySnapshot, Issue, PolicyDocument, StageKind, StageState,
    TopologyContext,
};
use tracing::{info, warn};

pub const RESOLVED_NOTE: &str = "All targets validated against current inventory.";

/// Lowercase and trim a reference for comparison.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Every token a rule target may legitimately refer to, normalized.
#[derive(Debug, Clone, Default)]
pub struct KnownTargets {
    devices: HashSet<String>,
    tokens: HashSet<String>,
}

impl KnownTargets {
    pub fn new(inventory: &InventorySnapshot, topology: Option<&TopologyContext>) -> Self {
        let devices = inventory
            .node_names()
            .filter(|name| !name.is_empty())
            .map(normalize)
            .collect();

        let mut tokens = HashSet::new();
        if let Some(topology) = topology {
            for subnet in &topology.subnets {
                let name = subnet.name.trim();
                let cidr = subnet.cidr.trim();
                let mut candidates = vec![name.to_string(), cidr.to_string()];
                if !name.is_empty() && !cidr.is_empty() {
                    candidates.push(format!("{} ({})", name, cidr));
                    candidates.push(format!("{}:{}", name, cidr));
                    candidates.push(format!("subnet:{}", name));
                    candidates.push(format!("subnet:{}", cidr));
                }
                tokens.extend(
                    candidates
                        .iter()
                        .filter(|c| !c.is_empty())
                        .map(|c| normalize(c)),
                );
            }
            for group in &topology.groups {
                if group.name.trim().is_empty() {
                    continue;
                }
                tokens.insert(normalize(&group.name));
                tokens.insert(normalize(&format!("group:{}", group.name)));
            }
        }

        Self { devices, tokens }
    }

    fn knows(&self, normalized: &str) -> bool {
        self.devices.contains(normalized) || self.tokens.contains(normalized)
    }

    /// Accept a target that names a device, subnet or group, directly or
    /// after a `prefix:`.
    pub fn accepts(&self, target: &str) -> bool {
        if self.knows(&normalize(target)) {
            return true;
        }
        match target.split_once(':') {
            Some((_, suffix)) => self.knows(&normalize(suffix)),
            None => false,
        }
    }
}

/// Collect one issue per unresolvable reference in `policy`.
pub fn find_issues(
    policy: &PolicyDocument,
    inventory: &InventorySnapshot,
    topology: Option<&TopologyContext>,
) -> Vec<Issue> {
    let known = KnownTargets::new(inventory, topology);
    let mut issues = Vec::new();

    for rule in &policy.policy_rules {
        for target in &rule.targets {
            if target.is_empty() || known.accepts(target) {
                continue;
            }
            issues.push(Issue::new(
                StageKind::Resolution,
                &rule.rule_id,
                format!(
                    "Unknown target '{}' referenced by rule {}",
                    target, rule.rule_id
                ),
            ));
        }
    }

    for step in &policy.enforcement_steps {
        if !inventory.contains(&step.device) {
            issues.push(Issue::new(
                StageKind::Resolution,
                &step.device,
                format!("Enforcement step references missing node '{}'", step.device),
            ));
        }
        if step.commands.is_empty() {
            issues.push(Issue::new(
                StageKind::Resolution,
                &step.device,
                format!("Enforcement step {} has no commands", step.step),
            ));
        }
    }

    for check in &policy.validation_checks {
        if !inventory.contains(&check.source_device) {
            issues.push(Issue::new(
                StageKind::Resolution,
                &check.check_id,
                format!(
                    "Validation check {} references missing node '{}'",
                    check.check_id, check.source_device
                ),
            ));
        }
        if check.commands.is_empty() {
            issues.push(Issue::new(
                StageKind::Resolution,
                &check.check_id,
                format!("Validation check {} has no commands", check.check_id),
            ));
        }
    }

    issues
}

/// Write the resolution outcome into the document's status.
pub fn apply_resolution(policy: &mut PolicyDocument, issues: &[Issue]) {
    if issues.is_empty() {
        policy.status.record(
            StageKind::Resolution,
            StageState::Completed,
            vec![RESOLVED_NOTE.to_string()],
        );
    } else {
        policy
            .status
            .record(StageKind::Resolution, StageState::Failed, render_issues(issues));
    }
}

/// Resolve `policy` and return the updated document.
pub fn resolve(
    mut policy: PolicyDocument,
    inventory: &InventorySnapshot,
    topology: Option<&TopologyContext>,
) -> PolicyDocument {
    let issues = find_issues(&policy, inventory, topology);
    for issue in &issues {
        warn!(policy_id = %policy.policy_id, subject = %issue.subject, "{}", issue);
    }
    apply_resolution(&mut policy, &issues);
    info!(
        policy_id = %policy.policy_id,
        state = %policy.status.resolution,
        issues = issues.len(),
        "resolution finished"
    );
    policy
}
