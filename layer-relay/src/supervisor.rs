//! Connection supervisor.
//!
//! Drives the client handshake, the upstream handshake, the fast-mode
//! identity swap, and launches the two splicer pumps. Any expected
//! transport/handshake failure is converted to a quiet close; nothing that
//! might contain key material is ever logged.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::config::Config;
use crate::stats::StatsRegistry;
use crate::{client_handshake, splicer, upstream_handshake};

/// Handle one accepted client connection end to end: both handshakes run
/// synchronously here, then the two relay pumps are spawned as independent
/// background tasks and this function returns without waiting on them.
pub async fn serve_client(stream: TcpStream, peer: SocketAddr, cfg: Arc<Config>, stats: Arc<StatsRegistry>) {
    let auth = match client_handshake::accept(stream, &cfg.users).await {
        Ok(auth) => auth,
        Err(_) => {
            tracing::debug!(%peer, "handshake rejected");
            return;
        }
    };

    tracing::debug!(%peer, user = %auth.user, dc = auth.dc_index, "client authenticated");
    stats.inc_connects(&auth.user);

    let reuse = cfg.fast_mode.then_some(auth.upstream_reuse);
    let upstream = match upstream_handshake::open(auth.dc_index, cfg.prefer_ipv6, reuse).await {
        Ok(upstream) => upstream,
        Err(_) => {
            tracing::debug!(%peer, user = %auth.user, "upstream unreachable");
            return;
        }
    };

    let client_reader = auth.reader;
    let mut client_writer = auth.writer;
    let mut upstream_reader = upstream.reader;
    let upstream_writer = upstream.writer;

    if cfg.fast_mode {
        // upstream→relay ciphertext is already valid relay→client
        // ciphertext under the client's encryption key: elide the
        // decrypt-then-reencrypt on that leg.
        upstream_reader.set_identity();
        client_writer.set_identity();
    }

    let read_buf_size = cfg.read_buf_size;
    let user_to_client = auth.user.clone();
    let user_to_upstream = auth.user;
    let stats_to_client = stats.clone();

    tokio::spawn(async move {
        splicer::pump(upstream_reader, client_writer, user_to_client, &stats_to_client, read_buf_size).await;
    });
    tokio::spawn(async move {
        splicer::pump(client_reader, upstream_writer, user_to_upstream, &stats, read_buf_size).await;
    });
}
