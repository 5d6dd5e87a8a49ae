#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Battle Mediation Server
//!
//! A WebSocket server that mediates Pokemon-style battles between two
//! human clients (PvP) or a human client and an in-process AI opponent,
//! without implementing battle rules itself — it owns connection
//! lifecycle, room pairing, and faithful relay of the embedded
//! simulator's protocol lines.

/// AI difficulty tiers and their shared scoring heuristics.
pub mod ai;

/// Server configuration and environment variables.
pub mod config;

/// Match/room orchestration: Room, RoomRegistry, MatchRunner, coordinators.
pub mod core;

/// Structured logging configuration.
pub mod logging;

/// Metrics collection and reporting.
pub mod metrics;

/// Wire protocol: control envelopes, error codes, room IDs, validation.
pub mod protocol;

/// The embedded battle engine (SimulatorAdapter and friends).
pub mod simulator;

/// Top-level orchestration: coordinator wiring, connection bindings, idle sweep.
pub mod server;

/// WebSocket connection handling.
pub mod websocket;
