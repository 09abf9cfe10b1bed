//! Intent Translator: natural-language intent → stored PolicyDocument
use chrono::{SecondsFormat, Utc};
use ibn_core::{
    IbnError, InventorySnapshot, PolicyDocument, PolicyStatus, Result, StageKind, StageState,
    TopologyContext,
};
use ibn_policy::PolicyStore;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::llm::LlmClient;
use crate::prompt::{PromptRenderer, SYSTEM_PROMPT};

lazy_static! {
    /// A whole reply wrapped in a markdown code fence
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n?(.*?)\s*```\s*$").unwrap();
}

/// Fields owned by later stages or the store; a model reply never sets them.
const STAGE_OWNED_KEYS: [&str; 4] = ["status", "activation_logs", "assurance_results", "revision"];

/// Turns intents into policy documents via a language model.
pub struct IntentTranslator<'a> {
    llm: &'a dyn LlmClient,
    prompts: PromptRenderer<'static>,
}

impl<'a> IntentTranslator<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Result<Self> {
        Ok(Self {
            llm,
            prompts: PromptRenderer::new()?,
        })
    }

    /// Translate, stamp and upsert one intent. Returns the stored document.
    pub async fn translate(
        &self,
        intent_text: &str,
        topology: &TopologyContext,
        inventory: Option<&InventorySnapshot>,
        store: &PolicyStore,
    ) -> Result<PolicyDocument> {
        let user_prompt = self
            .prompts
            .render_user_prompt(intent_text, topology, inventory)?;
        info!(model = self.llm.model_name(), "translating intent");

        let payload = self.llm.chat_json(SYSTEM_PROMPT, &user_prompt).await?;
        debug!(bytes = payload.len(), "model reply received");

        let mut policy = parse_policy(&payload)?;
        stamp_translation(&mut policy, intent_text);

        let stored = store.upsert(policy)?;
        info!(policy_id = %stored.policy_id, "translation completed");
        Ok(stored)
    }
}

/// One-shot form of [`IntentTranslator::translate`].
pub async fn translate_intent(
    llm: &dyn LlmClient,
    intent_text: &str,
    topology: &TopologyContext,
    inventory: Option<&InventorySnapshot>,
    store: &PolicyStore,
) -> Result<PolicyDocument> {
    IntentTranslator::new(llm)?
        .translate(intent_text, topology, inventory, store)
        .await
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fence(payload: &str) -> &str {
    match CODE_FENCE.captures(payload).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => payload.trim(),
    }
}

/// Parse a model reply into a document, dropping stage-owned fields.
pub fn parse_policy(payload: &str) -> Result<PolicyDocument> {
    let text = strip_code_fence(payload);
    let invalid = |reason: String| {
        IbnError::Translation(format!(
            "model response was not a valid policy ({}). Received:\n{}",
            reason, payload
        ))
    };

    let mut value: Value = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
    let Some(object) = value.as_object_mut() else {
        return Err(invalid("expected a JSON object".to_string()));
    };
    for key in STAGE_OWNED_KEYS {
        object.remove(key);
    }
    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
}

/// `policy-<UTC yyyymmddHHMMSS>-<6 hex>`
pub fn generate_policy_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("policy-{}-{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..6])
}

/// Fill identity defaults and reset the lifecycle to "translated only".
pub fn stamp_translation(policy: &mut PolicyDocument, intent_text: &str) {
    policy.policy_id = policy.policy_id.trim().to_string();
    if policy.policy_id.is_empty() {
        policy.policy_id = generate_policy_id();
    }
    if policy.intent.raw.trim().is_empty() {
        policy.intent.raw = intent_text.to_string();
    }

    policy.status = PolicyStatus::default();
    policy.status.record(StageKind::Translation, StageState::Completed, Vec::new());
    policy.status.last_updated = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_policy_drops_stage_owned_fields() {
        let policy = parse_policy(
            r#"{"policy_id": "p-1", "status": {"activation": "done"}, "revision": 9,
                "activation_logs": [{"device": "R1", "commands": [], "output": []}]}"#,
        )
        .unwrap();
        assert_eq!(policy.policy_id, "p-1");
        assert_eq!(policy.revision, 0);
        assert!(policy.activation_logs.is_empty());
        assert_eq!(policy.state(StageKind::Activation), StageState::Pending);
    }

    #[test]
    fn test_parse_policy_rejects_non_json() {
        let err = parse_policy("Sure! Here is your policy.").unwrap_err();
        match err {
            IbnError::Translation(msg) => assert!(msg.contains("Sure! Here is your policy.")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_policy_rejects_array() {
        assert!(matches!(parse_policy("[1, 2]"), Err(IbnError::Translation(_))));
    }

    #[test]
    fn test_generated_policy_id_shape() {
        let id = generate_policy_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "policy");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stamp_translation_defaults() {
        let mut policy = PolicyDocument::default();
        policy.status.resolution = StageState::Failed;
        stamp_translation(&mut policy, "block telnet");

        assert!(policy.policy_id.starts_with("policy-"));
        assert_eq!(policy.intent.raw, "block telnet");
        assert_eq!(policy.state(StageKind::Translation), StageState::Completed);
        assert_eq!(policy.state(StageKind::Resolution), StageState::Pending);
        assert!(policy.status.last_updated.as_deref().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_stamp_translation_keeps_model_values() {
        let mut policy = PolicyDocument::new("fw-telnet");
        policy.intent.raw = "Block telnet on FW-1".to_string();
        stamp_translation(&mut policy, "block telnet");
        assert_eq!(policy.policy_id, "fw-telnet");
        assert_eq!(policy.intent.raw, "Block telnet on FW-1");
    }
}
