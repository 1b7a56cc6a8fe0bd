use super::compiler::{compile, is_catch_all};
use super::traits::RuleEngine;
use super::types::{CompiledRule, RuleId};
use crate::config::RulesConfig;
use crate::error::Result;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub removed: usize,
    pub installed: usize,
    pub rejected: usize,
    pub truncated: usize,
}

/// Brings the engine's installed rules in line with a desired site list by
/// removing everything and installing a freshly numbered set.
pub struct RuleSynchronizer {
    engine: Arc<dyn RuleEngine>,
    config: RulesConfig,
    // Serializes passes so two callers never interleave remove/add calls.
    lock: Mutex<()>,
}

impl RuleSynchronizer {
    pub fn new(engine: Arc<dyn RuleEngine>, config: RulesConfig) -> Self {
        Self {
            engine,
            config,
            lock: Mutex::new(()),
        }
    }

    /// Builds the rule set for `sites` without touching the engine.
    pub fn build_rules(&self, sites: &[String]) -> (Vec<CompiledRule>, ReconcileReport) {
        let mut rules = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut report = ReconcileReport::default();
        let mut next_id: RuleId = 1;

        for site in sites {
            let patterns = compile(site);
            if patterns.is_empty() {
                warn!("Skipping block list entry '{}': nothing left after normalization", site);
                continue;
            }
            for pattern in patterns {
                if is_catch_all(&pattern) {
                    warn!("Rejecting pattern '{}' for '{}': matches every URL", pattern, site);
                    report.rejected += 1;
                    continue;
                }
                if !seen.insert(pattern.clone()) {
                    continue;
                }
                if rules.len() >= self.config.max_rules {
                    report.truncated += 1;
                    continue;
                }
                rules.push(CompiledRule::redirect_main_frame(
                    next_id,
                    self.config.priority,
                    pattern,
                    &self.config.block_page_url,
                ));
                next_id += 1;
            }
        }

        report.installed = rules.len();
        (rules, report)
    }

    /// Replaces the installed rules with the compiled form of `sites`.
    ///
    /// An engine failure aborts the pass where it happened; whatever was
    /// already removed stays removed until the next pass installs a full set.
    pub async fn reconcile(&self, sites: &[String]) -> Result<ReconcileReport> {
        let _guard = self.lock.lock().await;

        let existing_ids: Vec<RuleId> = self
            .engine
            .installed_rules()
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let removed = existing_ids.len();
        if !existing_ids.is_empty() {
            self.engine.update_rules(existing_ids, Vec::new()).await?;
        }

        let (rules, mut report) = self.build_rules(sites);
        report.removed = removed;

        if !rules.is_empty() {
            self.engine.update_rules(Vec::new(), rules).await?;
        }

        if report.truncated > 0 {
            info!(
                "Rule ceiling of {} reached, {} patterns not installed",
                self.config.max_rules, report.truncated
            );
        }
        info!(
            "Updated blocking rules: {} rules for {} sites",
            report.installed,
            sites.len()
        );
        Ok(report)
    }
}
