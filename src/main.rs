#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;

use axum::Router;
use clap::Parser;

use battle_mediation_server::config;
use battle_mediation_server::logging;
use battle_mediation_server::server::maintenance;
use battle_mediation_server::server::BattleMediationServer;
use battle_mediation_server::websocket;

/// Battle Mediation Server -- mediates turn-based battles between browser
/// clients and an embedded simulator.
#[derive(Parser, Debug)]
#[command(name = "battle-mediation-server")]
#[command(about = "A concurrent websocket gateway mediating PvP and AI battle matches")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Idle room timeout: {}s", cfg.server.idle_room_timeout_secs);
                println!("  Room sweep interval: {}s", cfg.server.room_sweep_interval_secs);
                println!("  Max team size: {}", cfg.server.max_team_size);
                println!("  Tier-5 AI (LLM) enabled: {}", cfg.ai.tier5_enabled());
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let port = cfg.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "starting battle mediation server");

    let server = BattleMediationServer::new(cfg);

    tokio::spawn(maintenance::run(server.clone()));

    let router: Router = websocket::create_router(server);
    let make_service = router.into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(error = %e, %addr, "failed to bind listener");
        anyhow::anyhow!("failed to bind {addr}: {e}")
    })?;

    tracing::info!(%addr, "battle mediation server listening");

    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("battle mediation server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
