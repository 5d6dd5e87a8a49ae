//! Stub for the tier-5 knowledge-base subprocess (spec.md §4.5). No real
//! knowledge-base binary ships with this crate's dependency stack; the
//! trait exists so tier 5 has a second, independently-failing input to
//! fall back past, per the spec's "on any failure of either" wording.

use async_trait::async_trait;

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Looks up supplementary notes for `species_name`. Always
    /// unavailable in this crate — no subprocess is spawned.
    async fn lookup(&self, species_name: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableKnowledgeBase;

#[async_trait]
impl KnowledgeBase for UnavailableKnowledgeBase {
    async fn lookup(&self, _species_name: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_knowledge_base_never_resolves() {
        let kb = UnavailableKnowledgeBase;
        assert!(kb.lookup("Pikachu").await.is_none());
    }
}
