//! Half-duplex copy loop.
//!
//! Two of these run per connection, one per direction, independently and in
//! no particular relative order; the connection ends once both have
//! returned.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::cipher_stream::{CryptoReader, CryptoWriter};
use crate::stats::StatsRegistry;

/// Pump bytes from `src` to `dst` until EOF or a transport error, updating
/// `user`'s stats along the way.
pub async fn pump<R, W>(
    mut src: CryptoReader<R>,
    mut dst: CryptoWriter<W>,
    user: String,
    stats: &StatsRegistry,
    read_buf_size: usize,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    stats.inc_curr_connects(&user);

    let mut buf = vec![0u8; read_buf_size];
    loop {
        match src.read(&mut buf).await {
            Ok(0) => {
                let _ = dst.flush().await;
                let _ = dst.shutdown().await;
                break;
            }
            Ok(n) => {
                stats.add_octets(&user, n as u64);
                if dst.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                if dst.flush().await.is_err() {
                    break;
                }
            }
            Err(_) => {
                let _ = dst.shutdown().await;
                break;
            }
        }
    }

    stats.dec_curr_connects(&user);
}
