//! Handles an inbound `start` envelope in AI mode (spec.md §4.8).

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::ai::LlmClient;
use crate::core::ai_match_runner::AiMatchRunner;
use crate::core::socket::SocketHandle;
use crate::metrics::ServerMetrics;
use crate::protocol::messages::ServerMessage;
use crate::protocol::types::{AiConfig, Team};
use crate::protocol::validation::validate_team;
use crate::simulator::adapter::SimulatorAdapter;

pub struct StartAiRequest {
    pub format_id: String,
    pub seed: Option<u64>,
    pub team: Team,
    pub difficulty: u8,
}

pub struct AiCoordinator {
    simulator: Arc<SimulatorAdapter>,
    metrics: Arc<ServerMetrics>,
    llm_client: Option<Arc<LlmClient>>,
    max_team_size: usize,
}

impl AiCoordinator {
    pub fn new(
        simulator: Arc<SimulatorAdapter>,
        metrics: Arc<ServerMetrics>,
        llm_client: Option<Arc<LlmClient>>,
        max_team_size: usize,
    ) -> Self {
        Self {
            simulator,
            metrics,
            llm_client,
            max_team_size,
        }
    }

    /// Immediately constructs an `AIMatchRunner` and binds the inbound
    /// socket to `p1`. No Room is created.
    pub async fn handle_start(
        &self,
        socket: SocketHandle,
        req: StartAiRequest,
    ) -> Option<Arc<AiMatchRunner>> {
        if let Err(err) = validate_team(&req.team, self.max_team_size, &self.simulator.dex) {
            socket.send_control(ServerMessage::error_with_code(
                err.to_string(),
                crate::protocol::error_codes::ErrorCode::InvalidTeam,
            ));
            return None;
        }

        let synthetic_room_id = format!("ai-{}", Uuid::new_v4());
        let ai_config = AiConfig::new(req.difficulty);

        match AiMatchRunner::spawn(
            synthetic_room_id.clone(),
            &req.format_id,
            req.seed,
            &self.simulator,
            "p1",
            req.team,
            ai_config,
            self.llm_client.clone(),
            self.metrics.clone(),
        )
        .await
        {
            Ok(runner) => {
                self.metrics
                    .increment_matches_started(crate::metrics::MatchMode::Ai);
                runner.bind_human(socket.clone()).await;
                socket.send_control(ServerMessage::BattleStarted {
                    room_id: synthetic_room_id,
                });
                Some(runner)
            }
            Err(err) => {
                warn!(error = %err, "simulator unavailable; ai match not started");
                socket.send_control(ServerMessage::error_with_code(
                    "simulator unavailable",
                    crate::protocol::error_codes::ErrorCode::SimulatorUnavailable,
                ));
                None
            }
        }
    }
}
