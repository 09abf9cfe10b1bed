//! Resolution stage: check every reference against the current inventory.
use async_trait::async_trait;
use ibn_core::{PolicyDocument, Result, Stage, StageContext, StageKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionStage;

#[async_trait]
impl Stage for ResolutionStage {
    fn kind(&self) -> StageKind {
        StageKind::Resolution
    }

    async fn run(&self, policy: PolicyDocument, ctx: &StageContext) -> Result<PolicyDocument> {
        Ok(ibn_policy::resolve(policy, &ctx.inventory, ctx.topology()))
    }
}
