pub mod compiler;
pub mod matcher;
mod memory;
mod synchronizer;
mod traits;
pub mod types;

pub use compiler::{compile, CATCH_ALL_PATTERN};
pub use memory::MemoryRuleEngine;
pub use synchronizer::{ReconcileReport, RuleSynchronizer};
pub use traits::RuleEngine;
pub use types::{CompiledRule, ResourceType, RuleId};
