//! AIMatchRunner: a MatchRunner whose `p2` outbound is consumed by an
//! AIChoiceEngine instead of a real socket (spec.md §4.4).

use std::sync::Arc;

use tracing::warn;

use crate::ai::{build_engine, ChoiceEngine, LlmClient};
use crate::core::match_runner::MatchRunner;
use crate::core::socket::SocketHandle;
use crate::metrics::ServerMetrics;
use crate::protocol::types::{AiConfig, RoomId, Side, Team};
use crate::simulator::adapter::{SimulatorAdapter, SimulatorError};

pub struct AiMatchRunner {
    pub match_runner: Arc<MatchRunner>,
}

impl AiMatchRunner {
    /// Constructs the match and starts the p2 decision loop. No Room is
    /// involved (spec.md §4.8): the human side binds directly.
    pub async fn spawn(
        room_id: RoomId,
        format_id: &str,
        seed: Option<u64>,
        simulator: &SimulatorAdapter,
        p1_name: &str,
        p1_team: Team,
        ai_config: AiConfig,
        llm_client: Option<Arc<LlmClient>>,
        metrics: Arc<ServerMetrics>,
    ) -> Result<Arc<Self>, SimulatorError> {
        let p2_team = simulator.dex.sample_team(p1_team.as_slice().len().max(1));
        let match_runner = MatchRunner::spawn(
            room_id,
            format_id,
            seed,
            simulator,
            p1_name,
            p1_team,
            "AI",
            p2_team,
            metrics.clone(),
        )
        .await?;

        let engine = build_engine(ai_config.tier, llm_client, metrics.clone());
        let runner = Arc::new(Self {
            match_runner: match_runner.clone(),
        });
        runner.clone().spawn_decision_loop(engine, ai_config.tier, metrics);
        Ok(runner)
    }

    fn spawn_decision_loop(
        self: Arc<Self>,
        engine: Arc<dyn ChoiceEngine>,
        tier: u8,
        metrics: Arc<ServerMetrics>,
    ) {
        tokio::spawn(async move {
            let notify = self.match_runner.request_notify(Side::P2);
            loop {
                notify.notified().await;
                if self.match_runner.has_ended() {
                    return;
                }
                let Some(request) = self.match_runner.last_request(Side::P2) else {
                    continue;
                };
                let command = engine.decide(&request).await;
                metrics.increment_ai_decision(tier);
                if let Err(err) = self.match_runner.forward_choice(Side::P2, &command) {
                    warn!(error = %err, "ai failed to forward its choice");
                    return;
                }
            }
        });
    }

    pub async fn bind_human(&self, socket: SocketHandle) {
        self.match_runner.bind(Side::P1, socket).await;
    }
}
