use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the battle mediation server (spec.md §0a / §6 `/metrics`).
#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,

    pub rooms_created: AtomicU64,
    pub rooms_deleted: AtomicU64,

    pub matches_started_pvp: AtomicU64,
    pub matches_started_ai: AtomicU64,
    pub matches_ended: AtomicU64,
    pub matches_ended_idle: AtomicU64,
    pub matches_ended_fatal: AtomicU64,

    pub binds_total: AtomicU64,
    pub binds_replaced_live_socket: AtomicU64,
    pub reconnects_completed: AtomicU64,

    pub ai_decisions_by_tier: [AtomicU64; 5],
    pub ai_tier5_fallbacks: AtomicU64,

    pub validation_failures: AtomicU64,
    pub transient_client_errors: AtomicU64,
    pub state_conflicts: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturating decrement: never underflows even under a racing double-close.
    pub fn decrement_active_connections(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_deleted(&self) {
        self.rooms_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches_started(&self, mode: MatchMode) {
        match mode {
            MatchMode::Pvp => self.matches_started_pvp.fetch_add(1, Ordering::Relaxed),
            MatchMode::Ai => self.matches_started_ai.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn increment_matches_ended(&self, reason: MatchEndReason) {
        self.matches_ended.fetch_add(1, Ordering::Relaxed);
        match reason {
            MatchEndReason::EndOfBattle => {}
            MatchEndReason::Idle => {
                self.matches_ended_idle.fetch_add(1, Ordering::Relaxed);
            }
            MatchEndReason::Fatal => {
                self.matches_ended_fatal.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn increment_binds(&self, replaced_live_socket: bool) {
        self.binds_total.fetch_add(1, Ordering::Relaxed);
        if replaced_live_socket {
            self.binds_replaced_live_socket
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_reconnects_completed(&self) {
        self.reconnects_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// `tier` is 1-indexed per spec.md §4.5.
    pub fn increment_ai_decision(&self, tier: u8) {
        if let Some(counter) = (tier as usize)
            .checked_sub(1)
            .and_then(|i| self.ai_decisions_by_tier.get(i))
        {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_ai_tier5_fallback(&self) {
        self.ai_tier5_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transient_client_errors(&self) {
        self.transient_client_errors
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_state_conflicts(&self) {
        self.state_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_deleted: self.rooms_deleted.load(Ordering::Relaxed),
            matches_started_pvp: self.matches_started_pvp.load(Ordering::Relaxed),
            matches_started_ai: self.matches_started_ai.load(Ordering::Relaxed),
            matches_ended: self.matches_ended.load(Ordering::Relaxed),
            binds_replaced_live_socket: self.binds_replaced_live_socket.load(Ordering::Relaxed),
            reconnects_completed: self.reconnects_completed.load(Ordering::Relaxed),
            ai_decisions_by_tier: std::array::from_fn(|i| {
                self.ai_decisions_by_tier[i].load(Ordering::Relaxed)
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MatchMode {
    Pvp,
    Ai,
}

#[derive(Debug, Clone, Copy)]
pub enum MatchEndReason {
    EndOfBattle,
    Idle,
    Fatal,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: u64,
    pub rooms_created: u64,
    pub rooms_deleted: u64,
    pub matches_started_pvp: u64,
    pub matches_started_ai: u64,
    pub matches_ended: u64,
    pub binds_replaced_live_socket: u64,
    pub reconnects_completed: u64,
    pub ai_decisions_by_tier: [u64; 5],
}
