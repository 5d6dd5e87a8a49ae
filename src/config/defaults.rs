//! Default value functions for configuration fields.
//!
//! Organized by category, following serde's `#[serde(default = ...)]` pattern
//! so every field is independently overridable.

use super::logging::LogFormat;

pub const fn default_port() -> u16 {
    3071
}

pub const fn default_heartbeat_interval_secs() -> u64 {
    5
}

pub const fn default_max_missed_pongs() -> u32 {
    3
}

pub const fn default_idle_room_timeout_secs() -> u64 {
    1800 // 30 minutes, per spec.md §5
}

pub const fn default_room_sweep_interval_secs() -> u64 {
    60
}

pub const fn default_room_code_length() -> usize {
    10 // 32-character alphabet: log2(32^10) = 50 bits, clears the spec's 48-bit floor
}

pub const fn default_max_team_size() -> usize {
    6
}

pub const fn default_default_format_id() -> &'static str {
    "gen9ou"
}

pub const fn default_log_dir() -> &'static str {
    "logs"
}

pub const fn default_log_filename() -> &'static str {
    "battle-mediation-server.log"
}

pub const fn default_rotation() -> &'static str {
    "daily"
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub const fn default_llm_timeout_secs() -> u64 {
    8 // spec.md §4.5 tier 5 hard timeout
}
