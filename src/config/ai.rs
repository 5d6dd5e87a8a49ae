//! Tier-5 AI configuration (spec.md §4.5, §6).

use super::defaults::default_llm_timeout_secs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Enables tier 5 when set; read from `LLM_API_KEY` by the loader.
    #[serde(default, skip_serializing)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn tier5_enabled(&self) -> bool {
        self.llm_api_key.is_some()
    }
}
