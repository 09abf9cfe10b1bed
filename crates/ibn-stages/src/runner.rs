//! Stage runner: load → apply → persist for one stored policy.
use std::sync::Arc;

use ibn_console::ConsoleConnector;
use ibn_core::{PolicyDocument, Result, Stage, StageContext};
use ibn_policy::PolicyStore;
use tracing::{debug, info_span, Instrument};

use crate::activation::ActivationStage;
use crate::assurance::AssuranceStage;
use crate::resolution::ResolutionStage;

/// Run `stage` on the stored policy `policy_id` and persist the result.
///
/// The write is a compare-and-swap on the revision that was loaded, so a
/// concurrent writer surfaces as `IbnError::Conflict` instead of a lost update.
pub async fn run_stage(
    stage: &dyn Stage,
    policy_id: &str,
    store: &PolicyStore,
    ctx: &StageContext,
) -> Result<PolicyDocument> {
    let kind = stage.kind();
    let span = info_span!("stage", stage = %kind, policy_id, trace_id = %ctx.trace_id);
    async move {
        let policy = store.require(policy_id)?;
        debug!(revision = policy.revision, "policy loaded");
        let updated = stage.run(policy, ctx).await?;
        store.upsert_checked(updated)
    }
    .instrument(span)
    .await
}

pub async fn resolve_policy(
    policy_id: &str,
    store: &PolicyStore,
    ctx: &StageContext,
) -> Result<PolicyDocument> {
    run_stage(&ResolutionStage, policy_id, store, ctx).await
}

pub async fn activate_policy(
    policy_id: &str,
    store: &PolicyStore,
    ctx: &StageContext,
    connector: Arc<dyn ConsoleConnector>,
) -> Result<PolicyDocument> {
    run_stage(&ActivationStage::new(connector), policy_id, store, ctx).await
}

pub async fn assure_policy(
    policy_id: &str,
    store: &PolicyStore,
    ctx: &StageContext,
    connector: Arc<dyn ConsoleConnector>,
) -> Result<PolicyDocument> {
    run_stage(&AssuranceStage::new(connector), policy_id, store, ctx).await
}
