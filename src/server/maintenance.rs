//! Background idle sweep: rooms and matches with no recent activity are
//! released (spec.md §5, "idle rooms... swept by a background task").

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::metrics::MatchEndReason;
use crate::server::BattleMediationServer;

/// Runs until the process exits. Call via `tokio::spawn`.
pub async fn run(server: Arc<BattleMediationServer>) {
    let interval_secs = server.config().server.room_sweep_interval_secs;
    let idle_timeout = Duration::from_secs(server.config().server.idle_room_timeout_secs);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        ticker.tick().await;
        sweep_once(&server, idle_timeout);
    }
}

fn sweep_once(server: &Arc<BattleMediationServer>, idle_timeout: Duration) {
    for room in server.rooms().battling_rooms() {
        let Some(match_runner) = room.match_runner.lock().expect("lock poisoned").clone() else {
            continue;
        };
        if match_runner.has_ended() {
            server.rooms().remove(&room.room_id);
            continue;
        }
        if match_runner.idle_for().is_some_and(|idle| idle > idle_timeout) {
            info!(room_id = %room.room_id, "closing match idle beyond threshold");
            match_runner.close(MatchEndReason::Idle);
            server.rooms().remove(&room.room_id);
        }
    }

    let stale_ai_matches: Vec<String> = server
        .ai_matches_snapshot()
        .into_iter()
        .filter_map(|(room_id, match_runner)| {
            if match_runner.has_ended() {
                return Some(room_id);
            }
            if match_runner.idle_for().is_some_and(|idle| idle > idle_timeout) {
                info!(room_id, "closing ai match idle beyond threshold");
                match_runner.close(MatchEndReason::Idle);
                return Some(room_id);
            }
            None
        })
        .collect();
    server.remove_ai_matches(&stale_ai_matches);

    server.rooms().sweep_idle(idle_timeout);
}
