//! Binary entrypoint: loads configuration, opens the listener(s), and
//! accepts connections into the supervisor.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use layer_relay::{config::Config, stats::StatsRegistry, supervisor};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "relay.toml".to_string());
    let cfg = match Config::load(&PathBuf::from(&config_path)) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    tracing::info!(users = cfg.users.len(), port = cfg.port, fast_mode = cfg.fast_mode, "starting relay");

    let stats = Arc::new(StatsRegistry::new(&cfg.users));

    let v4_listener = match TcpListener::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, cfg.port))).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind IPv4 listener on port {}: {e}", cfg.port);
            std::process::exit(1);
        }
    };

    let v6_listener = match TcpListener::bind(SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, cfg.port, 0, 0))).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            tracing::warn!("IPv6 listener unavailable, continuing on IPv4 only: {e}");
            None
        }
    };

    tokio::spawn(stats_printer(stats.clone(), Duration::from_secs(cfg.stats_print_period_secs)));

    let accept_loop = accept_forever(v4_listener, v6_listener, cfg, stats);

    tokio::select! {
        _ = accept_loop => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down on ctrl-c");
        }
    }
}

async fn accept_forever(
    v4: TcpListener,
    v6: Option<TcpListener>,
    cfg: Arc<Config>,
    stats: Arc<StatsRegistry>,
) {
    loop {
        let accepted = match &v6 {
            Some(v6) => tokio::select! {
                r = v4.accept() => r,
                r = v6.accept() => r,
            },
            None => v4.accept().await,
        };

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                tracing::debug!("accept failed: {e}");
                continue;
            }
        };

        let cfg = cfg.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            supervisor::serve_client(stream, peer, cfg, stats).await;
        });
    }
}

/// Log one summary line per user, every `period`, until the process exits.
async fn stats_printer(stats: Arc<StatsRegistry>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await; // first tick fires immediately; skip it
    loop {
        ticker.tick().await;
        for (user, connects, curr_connects_x2, octets) in stats.snapshot() {
            tracing::info!(
                user = %user,
                connects,
                curr_connects = curr_connects_x2 / 2,
                megabytes = octets as f64 / 1_000_000.0,
                "stats"
            );
        }
    }
}
