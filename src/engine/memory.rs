use super::matcher::first_match;
use super::traits::RuleEngine;
use super::types::{CompiledRule, ResourceType, RuleId};
use crate::error::{BlockerError, Result};
use arc_swap::ArcSwap;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-process rule engine. Readers see the installed set through an
/// `ArcSwap` snapshot so evaluation never waits on an update.
#[derive(Debug, Default)]
pub struct MemoryRuleEngine {
    rules: ArcSwap<Vec<CompiledRule>>,
    update_calls: AtomicUsize,
    // Fails the Nth update call (1-based) when non-zero.
    fail_on_call: AtomicUsize,
}

impl MemoryRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot of installed rules.
    pub fn snapshot(&self) -> Arc<Vec<CompiledRule>> {
        self.rules.load_full()
    }

    /// Installed URL filters, in ID order.
    pub fn patterns(&self) -> Vec<String> {
        let mut rules: Vec<CompiledRule> = self.snapshot().as_ref().clone();
        rules.sort_by_key(|r| r.id);
        rules.into_iter().map(|r| r.condition.url_filter).collect()
    }

    /// Where a top-level navigation to `url` would be redirected, if anywhere.
    pub fn evaluate(&self, url: &str) -> Option<String> {
        let rules = self.snapshot();
        first_match(&rules, url, ResourceType::MainFrame).map(|r| r.redirect_url().to_string())
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Makes the `call`-th future update (counted from now) fail.
    pub fn fail_update_after(&self, call: usize) {
        let current = self.update_calls.load(Ordering::SeqCst);
        self.fail_on_call.store(current + call, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RuleEngine for MemoryRuleEngine {
    async fn installed_rules(&self) -> Result<Vec<CompiledRule>> {
        Ok(self.snapshot().as_ref().clone())
    }

    async fn update_rules(&self, remove: Vec<RuleId>, add: Vec<CompiledRule>) -> Result<()> {
        let call = self.update_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call.load(Ordering::SeqCst) == call {
            return Err(BlockerError::RuleEngine(format!(
                "update call {} rejected by engine",
                call
            )));
        }

        let removed: FxHashSet<RuleId> = remove.into_iter().collect();
        let current = self.snapshot();
        let mut next: Vec<CompiledRule> = current
            .iter()
            .filter(|r| !removed.contains(&r.id))
            .cloned()
            .collect();

        let mut taken: FxHashSet<RuleId> = next.iter().map(|r| r.id).collect();
        for rule in add {
            if !taken.insert(rule.id) {
                return Err(BlockerError::RuleEngine(format!(
                    "Rule with id {} does not have a unique ID",
                    rule.id
                )));
            }
            next.push(rule);
        }

        self.rules.store(Arc::new(next));
        Ok(())
    }
}
