use super::types::{CompiledRule, RuleId};
use crate::error::Result;

/// The request-filtering engine that owns the installed rule set.
#[async_trait::async_trait]
pub trait RuleEngine: Send + Sync {
    /// Lists every rule currently installed.
    async fn installed_rules(&self) -> Result<Vec<CompiledRule>>;

    /// Removes the rules with the given IDs, then adds `add`. Fails as a whole
    /// if any added ID is already taken after the removals.
    async fn update_rules(&self, remove: Vec<RuleId>, add: Vec<CompiledRule>) -> Result<()>;
}
