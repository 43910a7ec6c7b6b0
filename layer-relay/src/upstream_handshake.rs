//! Upstream handshake initiator: opens a TCP connection to a Telegram
//! datacenter and performs the obfuscated2 handshake from the relay's side.

use layer_crypto::CtrCipher;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

use crate::cipher_stream::{CryptoReader, CryptoWriter};
use crate::config::{TG_DATACENTERS_V4, TG_DATACENTERS_V6, TG_DATACENTER_PORT};
use crate::errors::RelayError;
use crate::handshake::{raw_key_iv, reverse48, HANDSHAKE_LEN, IV_LEN, MAGIC, MAGIC_VAL_POS, PREKEY_LEN, SKIP_LEN};

/// Preamble beginnings Telegram datacenters refuse to see at the start of a
/// connection — a random nonce this unlucky is resampled.
const RESERVED_BEGINNINGS: [[u8; 4]; 4] = [*b"HEAD", *b"POST", *b"GET ", [0xee, 0xee, 0xee, 0xee]];

pub struct UpstreamAuth {
    pub reader: CryptoReader<ReadHalf<TcpStream>>,
    pub writer: CryptoWriter<WriteHalf<TcpStream>>,
}

/// Connect to the datacenter at `dc_index` and perform the obfuscated2
/// handshake, optionally reusing the client-side key material (fast mode).
pub async fn open(
    dc_index: i32,
    prefer_ipv6: bool,
    reuse: Option<[u8; 48]>,
) -> Result<UpstreamAuth, RelayError> {
    let addr = pick_endpoint(dc_index, prefer_ipv6)?;

    let stream = TcpStream::connect((addr, TG_DATACENTER_PORT))
        .await
        .map_err(|_| RelayError::UpstreamUnreachable)?;

    let mut nonce = random_preamble()?;
    nonce[MAGIC_VAL_POS..MAGIC_VAL_POS + 4].copy_from_slice(&MAGIC);

    if let Some(seed) = reuse {
        let mut rev = seed;
        rev.reverse();
        nonce[SKIP_LEN..SKIP_LEN + PREKEY_LEN + IV_LEN].copy_from_slice(&rev);
    }

    // Roles are swapped relative to the client handshake: the relay reads
    // from upstream using the *reversed* slice, and writes using the
    // forward slice.
    let prekey_iv = nonce[SKIP_LEN..SKIP_LEN + PREKEY_LEN + IV_LEN].to_vec();
    let (dec_key, dec_iv) = raw_key_iv(&reverse48(&prekey_iv));
    let (enc_key, enc_iv) = raw_key_iv(&prekey_iv);

    let decryptor = CtrCipher::new(&dec_key, &dec_iv).expect("32-byte key");
    let mut encryptor = CtrCipher::new(&enc_key, &enc_iv).expect("32-byte key");

    // Encrypt the whole 64-byte preamble; only bytes 56..64 of the result
    // are actually sent. This leaves the encryptor's counter advanced by
    // exactly 4 blocks, which is the correct starting position for the
    // payload that follows.
    let mut ciphertext = nonce;
    encryptor.transform(&mut ciphertext);
    let mut wire = nonce;
    wire[MAGIC_VAL_POS..].copy_from_slice(&ciphertext[MAGIC_VAL_POS..]);

    let (rd, mut wr) = tokio::io::split(stream);
    wr.write_all(&wire).await?;

    Ok(UpstreamAuth {
        reader: CryptoReader::new(rd, decryptor),
        writer: CryptoWriter::new(wr, encryptor),
    })
}

fn pick_endpoint(dc_index: i32, prefer_ipv6: bool) -> Result<&'static str, RelayError> {
    let table: &[&str] = if prefer_ipv6 { &TG_DATACENTERS_V6 } else { &TG_DATACENTERS_V4 };
    if dc_index < 0 || dc_index as usize >= table.len() {
        return Err(RelayError::UpstreamUnreachable);
    }
    Ok(table[dc_index as usize])
}

fn random_preamble() -> Result<[u8; HANDSHAKE_LEN], RelayError> {
    loop {
        let mut buf = [0u8; HANDSHAKE_LEN];
        getrandom::getrandom(&mut buf)?;
        if buf[0] == 0xef {
            continue;
        }
        if RESERVED_BEGINNINGS.iter().any(|p| buf[0..4] == *p) {
            continue;
        }
        if buf[4..8] == [0, 0, 0, 0] {
            continue;
        }
        return Ok(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_dc_index() {
        assert!(pick_endpoint(5, false).is_err());
        assert!(pick_endpoint(-1, false).is_err());
    }

    #[test]
    fn picks_v4_or_v6_table_by_flag() {
        assert_eq!(pick_endpoint(0, false).unwrap(), TG_DATACENTERS_V4[0]);
        assert_eq!(pick_endpoint(0, true).unwrap(), TG_DATACENTERS_V6[0]);
    }

    #[test]
    fn random_preamble_never_violates_reserved_patterns() {
        for _ in 0..500 {
            let buf = random_preamble().unwrap();
            assert_ne!(buf[0], 0xef);
            assert!(!RESERVED_BEGINNINGS.iter().any(|p| buf[0..4] == *p));
            assert_ne!(&buf[4..8], &[0, 0, 0, 0]);
        }
    }
}
