use serde::{Deserialize, Serialize};

pub type RuleId = u32;

/// One installed filter rule, shaped like a declarative request rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub id: RuleId,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    Redirect { redirect: Redirect },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Image,
    Script,
    Xmlhttprequest,
    Other,
}

impl CompiledRule {
    /// A rule redirecting top-level navigations that match `url_filter`.
    pub fn redirect_main_frame(
        id: RuleId,
        priority: u32,
        url_filter: String,
        block_page_url: &str,
    ) -> Self {
        Self {
            id,
            priority,
            action: RuleAction::Redirect {
                redirect: Redirect {
                    url: block_page_url.to_string(),
                },
            },
            condition: RuleCondition {
                url_filter,
                resource_types: vec![ResourceType::MainFrame],
            },
        }
    }

    pub fn url_filter(&self) -> &str {
        &self.condition.url_filter
    }

    pub fn redirect_url(&self) -> &str {
        match &self.action {
            RuleAction::Redirect { redirect } => &redirect.url,
        }
    }
}
