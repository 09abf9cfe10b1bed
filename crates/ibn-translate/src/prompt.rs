//! Prompt rendering for intent translation.
//!
//! The user prompt is a Handlebars template fed with:
//! - `context`: pretty JSON of the topology and the inventory snapshot
//! - `targets`: comma-separated device names, when the topology has nodes
//! - `intent`: the operator's intent text

use handlebars::Handlebars;
use ibn_core::{IbnError, InventorySnapshot, Result, TopologyContext};
use serde_json::{json, Value};

pub const SYSTEM_PROMPT: &str = "You design human readable and machine actionable network policies. \
Always respond with valid JSON that matches the requested schema.";

const USER_TEMPLATE_NAME: &str = "user";

const USER_TEMPLATE: &str = r#"Context:
{{context}}

You are given an intent in natural language. Generate a network policy object as JSON with fields: policy_id, intent, policy_rules, enforcement_steps, validation_checks, status, notes. Follow this schema:
{
  "policy_id": str,
  "intent": {
    "raw": original string,
    "summary": short paraphrase,
    "assumptions": [str]
  },
  "policy_rules": [ {
    "rule_id": str,
    "description": str,
    "targets": [str],
    "action": str,
    "constraints": [str]
  } ],
  "enforcement_steps": [ {
    "step": int,
    "device": str,
    "method": "telnet" or "api",
    "commands": [str],
    "notes": str
  } ],
  "validation_checks": [ {
    "check_id": str,
    "description": str,
    "type": str,
    "source_device": str,
    "commands": [str],
    "success_criteria": str
  } ],
  "status": {
    "translation": "pending",
    "resolution": "pending",
    "activation": "pending",
    "assurance": "pending"
  },
  "notes": str
}. Every command should be explicit. Use device names from the topology context.
{{#if targets}}Valid device targets: {{targets}}. Use only these names in the `targets` array and `device` fields. Describe subnets, chains, or interfaces within constraints or notes instead of adding them to targets.
{{/if}}
Intent:
{{intent}}"#;

/// Compiled prompt templates
pub struct PromptRenderer<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> PromptRenderer<'a> {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts are plain text; HTML escaping would mangle the JSON context.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(USER_TEMPLATE_NAME, USER_TEMPLATE)
            .map_err(|e| IbnError::Translation(format!("invalid prompt template: {}", e)))?;
        Ok(Self { handlebars })
    }

    pub fn render_user_prompt(
        &self,
        intent_text: &str,
        topology: &TopologyContext,
        inventory: Option<&InventorySnapshot>,
    ) -> Result<String> {
        let context = serde_json::to_string_pretty(&prompt_context(topology, inventory)?)?;
        self.handlebars
            .render(
                USER_TEMPLATE_NAME,
                &json!({
                    "context": context,
                    "targets": allowed_targets(topology),
                    "intent": intent_text,
                }),
            )
            .map_err(|e| IbnError::Translation(format!("prompt render error: {}", e)))
    }
}

fn prompt_context(topology: &TopologyContext, inventory: Option<&InventorySnapshot>) -> Result<Value> {
    let inventory = match inventory {
        Some(snapshot) => serde_json::to_value(snapshot)?,
        None => json!({}),
    };
    Ok(json!({
        "topology": {
            "name": topology.name,
            "description": topology.description,
            "nodes": topology.nodes,
            "subnets": topology.subnets,
            "groups": topology.groups,
        },
        "inventory": inventory,
    }))
}

/// Sorted, non-empty topology node names joined with ", ".
pub fn allowed_targets(topology: &TopologyContext) -> String {
    let mut names: Vec<&str> = topology.node_names().collect();
    names.sort_unstable();
    names.join(", ")
}
