//! Core server behaviour configuration: timing, thresholds, limits.

use super::defaults::{
    default_default_format_id, default_heartbeat_interval_secs, default_idle_room_timeout_secs,
    default_max_missed_pongs, default_max_team_size, default_room_code_length,
    default_room_sweep_interval_secs,
};
use serde::{Deserialize, Serialize};

/// Server-wide timing and limit configuration (spec.md §4.9, §5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_max_missed_pongs")]
    pub max_missed_pongs: u32,
    /// Idle-room threshold, default 30 minutes per spec.md §5.
    #[serde(default = "default_idle_room_timeout_secs")]
    pub idle_room_timeout_secs: u64,
    #[serde(default = "default_room_sweep_interval_secs")]
    pub room_sweep_interval_secs: u64,
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
    #[serde(default = "default_max_team_size")]
    pub max_team_size: usize,
    #[serde(default = "default_default_format_id_owned")]
    pub default_format_id: String,
}

fn default_default_format_id_owned() -> String {
    default_default_format_id().to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            max_missed_pongs: default_max_missed_pongs(),
            idle_room_timeout_secs: default_idle_room_timeout_secs(),
            room_sweep_interval_secs: default_room_sweep_interval_secs(),
            room_code_length: default_room_code_length(),
            max_team_size: default_max_team_size(),
            default_format_id: default_default_format_id_owned(),
        }
    }
}
