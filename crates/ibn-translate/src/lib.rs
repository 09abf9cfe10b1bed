//! IBN Translate: natural-language intents to policy documents
//!
//! ```text
//! intent text ─► prompt (topology + inventory) ─► LlmClient ─► JSON ─► PolicyDocument ─► store
//! ```

pub mod llm;
pub mod prompt;
pub mod translator;

pub use llm::{LlmClient, OpenAiClient};
pub use prompt::{allowed_targets, PromptRenderer, SYSTEM_PROMPT};
pub use translator::{
    generate_policy_id, parse_policy, stamp_translation, strip_code_fence, translate_intent,
    IntentTranslator,
};
