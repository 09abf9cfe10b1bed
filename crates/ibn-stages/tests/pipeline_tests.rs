//! Stages and pipeline against a scripted console connector and a temporary store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use std::time::Duration;

use async_trait::async_trait;
use ibn_console::{ConsoleConnector, ConsoleOptions, ConsoleTarget, TcpConsoleConnector};
use ibn_core::{
    EnforcementStep, IbnError, InventoryNode, InventorySnapshot, PolicyDocument, Result,
    StageContext, StageKind, StageState, ValidationCheck,
};
use ibn_policy::PolicyStore;
use ibn_stages::{
    activate_policy, assure_policy, resolve_policy, Pipeline, PipelineOptions, ACTIVATED_NOTE,
    ASSURED_NOTE,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

/// Answers each command from a fixed table and records every batch it ran.
#[derive(Default)]
struct ScriptedConsole {
    replies: HashMap<String, String>,
    unreachable: HashSet<String>,
    batches: Mutex<Vec<(ConsoleTarget, Vec<String>)>>,
}

impl ScriptedConsole {
    fn reply(mut self, command: &str, output: &str) -> Self {
        self.replies.insert(command.to_string(), output.to_string());
        self
    }

    fn unreachable(mut self, device: &str) -> Self {
        self.unreachable.insert(device.to_string());
        self
    }

    fn batches(&self) -> Vec<(ConsoleTarget, Vec<String>)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConsoleConnector for ScriptedConsole {
    async fn run_batch(&self, target: &ConsoleTarget, commands: &[String]) -> Result<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .push((target.clone(), commands.to_vec()));
        if self.unreachable.contains(&target.device) {
            return Err(IbnError::device(&target.device, "connection refused"));
        }
        Ok(commands
            .iter()
            .map(|c| self.replies.get(c).cloned().unwrap_or_default())
            .collect())
    }
}

fn node(name: &str, host: Option<&str>, port: Option<u16>) -> InventoryNode {
    InventoryNode {
        node_id: format!("id-{}", name),
        name: name.to_string(),
        node_type: "qemu".to_string(),
        console_host: host.map(str::to_string),
        console_port: port,
        status: "started".to_string(),
        ..Default::default()
    }
}

fn context(nodes: Vec<InventoryNode>) -> StageContext {
    let inventory = InventorySnapshot {
        topology_name: "lab".to_string(),
        project_id: "proj-1".to_string(),
        nodes,
        ..Default::default()
    };
    StageContext::new(inventory, "192.0.2.1")
}

fn step(n: u32, device: &str, commands: &[&str]) -> EnforcementStep {
    EnforcementStep {
        step: n,
        device: device.to_string(),
        method: "telnet".to_string(),
        commands: commands.iter().map(|c| c.to_string()).collect(),
        notes: String::new(),
    }
}

fn check(id: &str, device: &str, commands: &[&str], criteria: &str) -> ValidationCheck {
    ValidationCheck {
        check_id: id.to_string(),
        source_device: device.to_string(),
        commands: commands.iter().map(|c| c.to_string()).collect(),
        success_criteria: criteria.to_string(),
        ..Default::default()
    }
}

fn firewall_policy() -> PolicyDocument {
    let mut policy = PolicyDocument::new("fw-telnet");
    policy.enforcement_steps = vec![step(1, "FW-1", &["iptables -A INPUT -p tcp --dport 23 -j DROP"])];
    policy.validation_checks = vec![check("c1", "FW-1", &["iptables -L INPUT"], "DROP")];
    policy
}

fn store_with(policy: PolicyDocument) -> (tempfile::TempDir, PolicyStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = PolicyStore::open(dir.path().join("ibn_policies.yaml")).unwrap();
    store.upsert(policy).unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_firewall_policy_end_to_end() {
    let (_dir, store) = store_with(firewall_policy());
    let ctx = context(vec![node("FW-1", Some("192.0.2.5"), Some(5000))]);
    let console = Arc::new(
        ScriptedConsole::default().reply("iptables -L INPUT", "DROP tcp -- anywhere tcp dpt:telnet"),
    );

    let report = Pipeline::standard(console.clone())
        .run("fw-telnet", &store, &ctx, PipelineOptions::default())
        .await
        .unwrap();

    assert!(report.succeeded());
    let stages: Vec<StageKind> = report.outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(
        stages,
        vec![StageKind::Resolution, StageKind::Activation, StageKind::Assurance]
    );

    let stored = store.require("fw-telnet").unwrap();
    assert_eq!(stored.state(StageKind::Activation), StageState::Completed);
    assert_eq!(stored.status.activation_details, vec![ACTIVATED_NOTE.to_string()]);
    assert_eq!(stored.state(StageKind::Assurance), StageState::Completed);
    assert_eq!(stored.status.assurance_details, vec![ASSURED_NOTE.to_string()]);
    assert_eq!(stored.activation_logs.len(), 1);
    assert_eq!(stored.activation_logs[0].device, "FW-1");
    assert_eq!(stored.assurance_results.len(), 1);
    assert!(stored.assurance_results[0].success);

    let batches = console.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].0.host, "192.0.2.5");
    assert_eq!(batches[0].0.port, 5000);
}

#[tokio::test]
async fn test_policy_without_checks_is_assured() {
    let mut policy = PolicyDocument::new("fw-status");
    policy.enforcement_steps = vec![step(1, "FW-1", &["show status"])];
    let (_dir, store) = store_with(policy);
    let ctx = context(vec![node("FW-1", Some("192.0.2.5"), Some(5000))]);
    let console = Arc::new(ScriptedConsole::default().reply("show status", "FW-1 up"));

    let report = Pipeline::standard(console.clone())
        .run("fw-status", &store, &ctx, PipelineOptions::default())
        .await
        .unwrap();

    assert!(report.succeeded());
    let stored = store.require("fw-status").unwrap();
    assert_eq!(stored.state(StageKind::Activation), StageState::Completed);
    assert_eq!(stored.state(StageKind::Assurance), StageState::Completed);
    assert_eq!(stored.activation_logs.len(), 1);
    assert!(stored.assurance_results.is_empty());
    assert_eq!(console.batches().len(), 1);
}

#[tokio::test]
async fn test_console_hangup_fails_activation() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();
        let _ = lines.next_line().await;
    });

    let (_dir, store) = store_with(firewall_policy());
    let inventory = InventorySnapshot {
        topology_name: "lab".to_string(),
        nodes: vec![node("FW-1", None, Some(port))],
        ..Default::default()
    };
    let ctx = StageContext::new(inventory, "127.0.0.1");
    let connector = Arc::new(TcpConsoleConnector::new(ConsoleOptions {
        timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(20),
        idle_polls: 3,
        flush_delay: Duration::from_millis(50),
    }));

    let updated = activate_policy("fw-telnet", &store, &ctx, connector)
        .await
        .unwrap();

    assert_eq!(updated.state(StageKind::Activation), StageState::Failed);
    assert_eq!(updated.status.activation_details.len(), 1);
    assert!(updated.status.activation_details[0].starts_with("Failed to run commands on FW-1: "));
    assert!(updated.activation_logs.is_empty());
}

#[tokio::test]
async fn test_pipeline_halts_after_failed_resolution() {
    let mut policy = firewall_policy();
    policy.enforcement_steps.push(step(2, "R9", &["show run"]));
    let (_dir, store) = store_with(policy);
    let ctx = context(vec![node("FW-1", Some("192.0.2.5"), Some(5000))]);
    let console = Arc::new(ScriptedConsole::default());

    let report = Pipeline::standard(console.clone())
        .run("fw-telnet", &store, &ctx, PipelineOptions::default())
        .await
        .unwrap();

    assert_eq!(report.halted_at, Some(StageKind::Resolution));
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        report.outcomes[0].details,
        vec!["Enforcement step references missing node 'R9'".to_string()]
    );
    assert!(console.batches().is_empty());

    let stored = store.require("fw-telnet").unwrap();
    assert_eq!(stored.state(StageKind::Resolution), StageState::Failed);
    assert_eq!(stored.state(StageKind::Activation), StageState::Pending);
}

#[tokio::test]
async fn test_skip_flags_leave_stages_pending() {
    let (_dir, store) = store_with(firewall_policy());
    let ctx = context(vec![node("FW-1", Some("192.0.2.5"), Some(5000))]);
    let console = Arc::new(ScriptedConsole::default());
    let options = PipelineOptions {
        skip_activation: true,
        skip_assurance: false,
    };

    let report = Pipeline::standard(console.clone())
        .run("fw-telnet", &store, &ctx, options)
        .await
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.skipped_at, Some(StageKind::Activation));
    assert!(console.batches().is_empty());
    let stored = store.require("fw-telnet").unwrap();
    assert_eq!(stored.state(StageKind::Resolution), StageState::Completed);
    assert_eq!(stored.state(StageKind::Activation), StageState::Pending);
    assert_eq!(stored.state(StageKind::Assurance), StageState::Pending);
}

#[tokio::test]
async fn test_skip_assurance_stops_after_activation() {
    let (_dir, store) = store_with(firewall_policy());
    let ctx = context(vec![node("FW-1", Some("192.0.2.5"), Some(5000))]);
    let console = Arc::new(ScriptedConsole::default());
    let options = PipelineOptions {
        skip_activation: false,
        skip_assurance: true,
    };

    let mut started = Vec::new();
    let report = Pipeline::standard(console.clone())
        .run_observed("fw-telnet", &store, &ctx, options, |kind| started.push(kind))
        .await
        .unwrap();

    assert_eq!(started, vec![StageKind::Resolution, StageKind::Activation]);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.skipped_at, Some(StageKind::Assurance));
    assert_eq!(console.batches().len(), 1);
}

#[tokio::test]
async fn test_activation_continues_past_failing_steps() {
    let mut policy = PolicyDocument::new("multi");
    policy.enforcement_steps = vec![
        step(1, "R1", &["conf t", "end"]),
        step(2, "R2", &["conf t"]),
        step(3, "R3", &["conf t"]),
        step(4, "R4", &[]),
        step(5, "GHOST", &["conf t"]),
    ];
    let (_dir, store) = store_with(policy);
    let ctx = context(vec![
        node("R1", Some("0.0.0.0"), Some(5001)),
        node("R2", None, Some(5002)),
        node("R3", None, None),
        node("R4", None, Some(5004)),
    ]);
    let console = Arc::new(ScriptedConsole::default().reply("end", "R1#").unreachable("R2"));

    let updated = activate_policy("multi", &store, &ctx, console.clone())
        .await
        .unwrap();

    assert_eq!(updated.state(StageKind::Activation), StageState::Failed);
    assert_eq!(
        updated.status.activation_details,
        vec![
            "Failed to run commands on R2: connection refused".to_string(),
            "Device 'R3' missing console port info".to_string(),
            "Device 'GHOST' missing from inventory".to_string(),
        ]
    );
    assert_eq!(updated.activation_logs.len(), 1);
    assert_eq!(updated.activation_logs[0].device, "R1");
    assert_eq!(updated.activation_logs[0].output, vec![String::new(), "R1#".to_string()]);

    let batches = console.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].0.host, "192.0.2.1");
    assert_eq!(store.require("multi").unwrap(), updated);
}

#[tokio::test]
async fn test_activation_replaces_previous_logs() {
    let (_dir, store) = store_with(firewall_policy());
    let ctx = context(vec![node("FW-1", Some("192.0.2.5"), Some(5000))]);
    let console = Arc::new(ScriptedConsole::default());

    activate_policy("fw-telnet", &store, &ctx, console.clone()).await.unwrap();
    let second = activate_policy("fw-telnet", &store, &ctx, console).await.unwrap();
    assert_eq!(second.activation_logs.len(), 1);
}

#[tokio::test]
async fn test_assurance_outcomes() {
    let mut policy = PolicyDocument::new("checks");
    policy.validation_checks = vec![
        check("pass", "R1", &["show result"], "  PASS "),
        check("fail", "R1", &["show fail"], "PASS"),
        check("any-output", "R1", &["show result"], ""),
        check("silent", "R1", &["show nothing"], ""),
        check("no-commands", "R1", &[], "PASS"),
        check("no-device", "R7", &["show result"], "PASS"),
        check("down", "R2", &["show result"], "PASS"),
    ];
    let (_dir, store) = store_with(policy);
    let ctx = context(vec![
        node("R1", None, Some(5001)),
        node("R2", None, Some(5002)),
    ]);
    let console = Arc::new(
        ScriptedConsole::default()
            .reply("show result", "result: PASS\n")
            .reply("show fail", "result: FAIL\n")
            .unreachable("R2"),
    );

    let updated = assure_policy("checks", &store, &ctx, console).await.unwrap();

    assert_eq!(updated.state(StageKind::Assurance), StageState::Failed);
    assert_eq!(
        updated.status.assurance_details,
        vec![
            "Validation check fail did not meet criteria 'PASS'".to_string(),
            "Validation check silent did not meet criteria ''".to_string(),
            "Validation check no-commands missing port/commands".to_string(),
            "Validation check no-device cannot find device 'R7'".to_string(),
            "Validation check down failed: connection refused".to_string(),
        ]
    );

    let results: Vec<(&str, bool)> = updated
        .assurance_results
        .iter()
        .map(|r| (r.check_id.as_str(), r.success))
        .collect();
    assert_eq!(
        results,
        vec![("pass", true), ("fail", false), ("any-output", true), ("silent", false)]
    );
    assert_eq!(updated.assurance_results[0].criteria, "PASS");
}

#[tokio::test]
async fn test_resolution_of_unknown_policy() {
    let dir = tempfile::tempdir().unwrap();
    let store = PolicyStore::open(dir.path().join("ibn_policies.yaml")).unwrap();
    let ctx = context(Vec::new());

    let err = resolve_policy("missing", &store, &ctx).await.unwrap_err();
    assert!(matches!(err, IbnError::NotFound { kind: "policy", .. }));
}

#[tokio::test]
async fn test_stage_results_are_written_with_revision_check() {
    let (_dir, store) = store_with(firewall_policy());
    let ctx = context(vec![node("FW-1", Some("192.0.2.5"), Some(5000))]);
    let before = store.require("fw-telnet").unwrap().revision;

    let after = resolve_policy("fw-telnet", &store, &ctx).await.unwrap();
    assert_eq!(after.revision, before + 1);
    assert_eq!(store.require("fw-telnet").unwrap().revision, after.revision);
}
