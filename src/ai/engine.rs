//! AIChoiceEngine: the difficulty-tiered `decide` operation (spec.md §4.5).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tracing::warn;

use crate::ai::heuristics::{evaluate_move, evaluate_switch, type_score, weighted_move_score, RequestView};
use crate::ai::knowledge_base::KnowledgeBase;
use crate::ai::llm_client::LlmClient;
use crate::metrics::ServerMetrics;

/// One difficulty tier. `decide` never panics and never blocks
/// indefinitely (spec.md §4.5: "sub-second for tiers 1..4"; tier 5 is
/// bounded by its own hard timeout).
#[async_trait]
pub trait ChoiceEngine: Send + Sync {
    async fn decide(&self, request: &Value) -> String;
}

fn parse(request: &Value) -> Option<RequestView> {
    serde_json::from_value(request.clone()).ok()
}

fn switch_command(view: &RequestView, own_active_index: usize) -> Option<String> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, member) in view.team.iter().enumerate() {
        if idx == own_active_index || member.fainted {
            continue;
        }
        let score = evaluate_switch(member, &view.opponent_active.types);
        if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| format!("switch {}", idx + 1))
}

fn own_active_index(view: &RequestView) -> usize {
    view.team
        .iter()
        .position(|m| m.name == view.active)
        .unwrap_or(0)
}

/// Tier 1: uniform random among enabled moves; forced switch -> first
/// non-fainted bench slot; team preview is not separately modelled by
/// this crate's engine, so an empty move list also falls through to
/// `default`.
pub struct RandomEngine;

#[async_trait]
impl ChoiceEngine for RandomEngine {
    async fn decide(&self, request: &Value) -> String {
        let Some(view) = parse(request) else {
            return "default".to_string();
        };
        if view.moves.is_empty() {
            return switch_command(&view, own_active_index(&view)).unwrap_or_else(|| "default".to_string());
        }
        let idx = rand::rng().random_range(0..view.moves.len());
        format!("move {}", idx + 1)
    }
}

/// Tier 2: maximise type-chart effectiveness; ties broken uniformly.
pub struct TypeChartEngine;

#[async_trait]
impl ChoiceEngine for TypeChartEngine {
    async fn decide(&self, request: &Value) -> String {
        let Some(view) = parse(request) else {
            return "default".to_string();
        };
        if view.moves.is_empty() {
            return switch_command(&view, own_active_index(&view)).unwrap_or_else(|| "default".to_string());
        }
        let scores: Vec<f64> = view
            .moves
            .iter()
            .map(|m| type_score(m, &view.opponent_active.types))
            .collect();
        let best = scores.iter().cloned().fold(f64::MIN, f64::max);
        let candidates: Vec<usize> = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| (**s - best).abs() < f64::EPSILON)
            .map(|(i, _)| i)
            .collect();
        let pick = candidates[rand::rng().random_range(0..candidates.len())];
        format!("move {}", pick + 1)
    }
}

const TIER3_SWITCH_THRESHOLD: f64 = 0.30;
const TIER4_SWITCH_THRESHOLD: f64 = 0.25;

/// Tier 3: weighted move score, switches below 30% HP.
pub struct WeightedScoreEngine;

#[async_trait]
impl ChoiceEngine for WeightedScoreEngine {
    async fn decide(&self, request: &Value) -> String {
        let Some(view) = parse(request) else {
            return "default".to_string();
        };
        if view.hp_fraction < TIER3_SWITCH_THRESHOLD {
            if let Some(cmd) = switch_command(&view, own_active_index(&view)) {
                return cmd;
            }
        }
        best_move_command(&view, weighted_move_score).unwrap_or_else(|| "default".to_string())
    }
}

fn best_move_command(
    view: &RequestView,
    score_fn: impl Fn(&crate::ai::heuristics::MoveView, &[crate::simulator::dex::Type]) -> f64,
) -> Option<String> {
    if view.moves.is_empty() {
        return None;
    }
    let (idx, _) = view
        .moves
        .iter()
        .enumerate()
        .map(|(i, m)| (i, score_fn(m, &view.opponent_active.types)))
        .fold((0usize, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
    Some(format!("move {}", idx + 1))
}

/// Tier 4: full evaluate_move/evaluate_switch heuristic, switches below 25%.
pub struct HeuristicEngine;

impl HeuristicEngine {
    fn decide_sync(request: &Value) -> String {
        let Some(view) = parse(request) else {
            return "default".to_string();
        };
        let own_idx = own_active_index(&view);
        let mut best_switch: Option<(String, f64)> = None;
        if view.hp_fraction < TIER4_SWITCH_THRESHOLD {
            for (idx, member) in view.team.iter().enumerate() {
                if idx == own_idx || member.fainted {
                    continue;
                }
                let score = evaluate_switch(member, &view.opponent_active.types);
                if best_switch.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                    best_switch = Some((format!("switch {}", idx + 1), score));
                }
            }
        }
        let mut best_move: Option<(String, f64)> = None;
        for (idx, mv) in view.moves.iter().enumerate() {
            let score = evaluate_move(mv, &view.opponent_active.types);
            if best_move.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best_move = Some((format!("move {}", idx + 1), score));
            }
        }
        match (best_switch, best_move) {
            (Some((cmd, switch_score)), Some((move_cmd, move_score))) => {
                if switch_score > move_score {
                    cmd
                } else {
                    move_cmd
                }
            }
            (Some((cmd, _)), None) => cmd,
            (None, Some((cmd, _))) => cmd,
            (None, None) => "default".to_string(),
        }
    }
}

#[async_trait]
impl ChoiceEngine for HeuristicEngine {
    async fn decide(&self, request: &Value) -> String {
        Self::decide_sync(request)
    }
}

/// Tier 5: consults an LLM and (nominally) a knowledge base, falling back
/// to tier 4 on any failure (spec.md §4.5).
pub struct LlmBackedEngine {
    llm: Arc<LlmClient>,
    knowledge_base: Arc<dyn KnowledgeBase>,
    timeout: Duration,
    metrics: Arc<ServerMetrics>,
}

impl LlmBackedEngine {
    pub fn new(
        llm: Arc<LlmClient>,
        knowledge_base: Arc<dyn KnowledgeBase>,
        timeout: Duration,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            llm,
            knowledge_base,
            timeout,
            metrics,
        }
    }

    fn prompt(view: &RequestView, notes: Option<&str>) -> String {
        format!(
            "You are battling as {}. Your active is {} at {:.0}% HP facing {}. \
             Available moves: {:?}. Notes: {}. \
             Respond with JSON {{\"command\": \"move N\"}} or {{\"command\": \"switch N\"}}.",
            view.side,
            view.active,
            view.hp_fraction * 100.0,
            view.opponent_active.name,
            view.moves.iter().map(|m| m.name.clone()).collect::<Vec<_>>(),
            notes.unwrap_or("none"),
        )
    }
}

#[async_trait]
impl ChoiceEngine for LlmBackedEngine {
    async fn decide(&self, request: &Value) -> String {
        let Some(view) = parse(request) else {
            return "default".to_string();
        };
        let notes = self.knowledge_base.lookup(&view.opponent_active.name).await;
        let prompt = Self::prompt(&view, notes.as_deref());

        match self.llm.decide(prompt, self.timeout).await {
            Ok(decision) => decision.command,
            Err(err) => {
                warn!(error = %err, "tier-5 llm call failed; falling back to tier 4");
                self.metrics.increment_ai_tier5_fallback();
                HeuristicEngine::decide_sync(request)
            }
        }
    }
}

/// Builds the engine for `tier` (clamped 1..5 by `AiConfig::new`).
pub fn build_engine(
    tier: u8,
    llm_client: Option<Arc<LlmClient>>,
    metrics: Arc<ServerMetrics>,
) -> Arc<dyn ChoiceEngine> {
    match tier {
        1 => Arc::new(RandomEngine),
        2 => Arc::new(TypeChartEngine),
        3 => Arc::new(WeightedScoreEngine),
        5 => match llm_client {
            Some(client) => Arc::new(LlmBackedEngine::new(
                client,
                Arc::new(crate::ai::knowledge_base::UnavailableKnowledgeBase),
                Duration::from_secs(8),
                metrics,
            )),
            None => Arc::new(HeuristicEngine),
        },
        _ => Arc::new(HeuristicEngine),
    }
}
