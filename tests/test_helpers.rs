use std::sync::Arc;

use battle_mediation_server::config::Config;
use battle_mediation_server::server::BattleMediationServer;
use battle_mediation_server::websocket::create_router;
use tokio::net::TcpListener;

/// Configuration tuned for fast, deterministic tests: short idle timeouts,
/// a frequent sweep, and small room codes so failures are readable.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.idle_room_timeout_secs = 2;
    config.server.room_sweep_interval_secs = 1;
    config.server.room_code_length = 6;
    config
}

/// Spawns a `BattleMediationServer` plus its axum router on an ephemeral
/// port and returns the bound address. The maintenance sweep runs
/// alongside it, same as in `main.rs`.
#[allow(dead_code)]
pub async fn start_test_server() -> std::net::SocketAddr {
    start_test_server_with_config(test_config()).await
}

#[allow(dead_code)]
pub async fn start_test_server_with_config(config: Config) -> std::net::SocketAddr {
    let server = BattleMediationServer::new(config);
    tokio::spawn(battle_mediation_server::server::maintenance::run(server.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(server);

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .unwrap();
    });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    addr
}

pub type WsSender = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    tokio_tungstenite::tungstenite::Message,
>;
pub type WsReceiver = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

#[allow(dead_code)]
pub async fn connect_client(addr: std::net::SocketAddr) -> (WsSender, WsReceiver) {
    use futures_util::StreamExt;

    let url = format!("ws://{addr}/battle");
    let (stream, _) = tokio::time::timeout(
        tokio::time::Duration::from_secs(5),
        tokio_tungstenite::connect_async(&url),
    )
    .await
    .expect("websocket connect timed out")
    .expect("failed to connect");
    stream.split()
}

/// Reads frames until one matches `predicate`, skipping anything else
/// (raw protocol lines interleave with control envelopes and are not
/// always relevant to a given assertion).
#[allow(dead_code)]
pub async fn recv_until(
    rx: &mut WsReceiver,
    predicate: impl Fn(&str) -> bool,
) -> Option<String> {
    use futures_util::StreamExt;

    for _ in 0..200 {
        match tokio::time::timeout(tokio::time::Duration::from_secs(3), rx.next()).await {
            Ok(Some(Ok(tokio_tungstenite::tungstenite::Message::Text(text)))) => {
                if predicate(&text) {
                    return Some(text.to_string());
                }
            }
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
    None
}
