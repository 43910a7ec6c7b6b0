//! Client handshake acceptor: reads the 64-byte obfuscation preamble and
//! tries each configured user in order until one decrypts to a matching
//! magic value.

use layer_crypto::CtrCipher;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf, WriteHalf};

use crate::cipher_stream::{CryptoReader, CryptoWriter};
use crate::config::UserEntry;
use crate::errors::RelayError;
use crate::handshake::{keys_from_prekey_iv, reverse48, HANDSHAKE_LEN, IV_LEN, MAGIC, MAGIC_VAL_POS, PREKEY_LEN, SKIP_LEN};

/// Everything the supervisor needs once a client has authenticated.
pub struct ClientAuth<S> {
    pub reader: CryptoReader<ReadHalf<S>>,
    pub writer: CryptoWriter<WriteHalf<S>>,
    pub user: String,
    pub dc_index: i32,
    /// `enc_key || enc_iv` (48 bytes) — the relay→client keystream seed,
    /// passed to the upstream handshake in fast mode so upstream ciphertext
    /// equals client-bound ciphertext.
    pub upstream_reuse: [u8; 48],
}

/// Read the 64-byte preamble and try every configured user in order; the
/// first magic match wins.
pub async fn accept<S>(stream: S, users: &[UserEntry]) -> Result<ClientAuth<S>, RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut rd, wr) = tokio::io::split(stream);

    let mut handshake = [0u8; HANDSHAKE_LEN];
    rd.read_exact(&mut handshake)
        .await
        .map_err(|_| RelayError::HandshakeRejected)?;

    for user in users {
        let dec_prekey_iv = &handshake[SKIP_LEN..SKIP_LEN + PREKEY_LEN + IV_LEN];
        let (dec_key, dec_iv) = keys_from_prekey_iv(dec_prekey_iv, &user.secret);
        let mut decryptor = CtrCipher::new(&dec_key, &dec_iv).expect("sha256 output is 32 bytes");

        let mut decrypted = handshake;
        decryptor.transform(&mut decrypted);

        if decrypted[MAGIC_VAL_POS..MAGIC_VAL_POS + 4] != MAGIC {
            // A fresh trial decryptor is required per user: CTR state must
            // not be reused across candidates.
            continue;
        }

        let dc_index = {
            let raw = i16::from_le_bytes([decrypted[60], decrypted[61]]);
            raw.unsigned_abs() as i32 - 1
        };

        let rev = reverse48(dec_prekey_iv);
        let (enc_key, enc_iv) = keys_from_prekey_iv(&rev, &user.secret);
        let encryptor = CtrCipher::new(&enc_key, &enc_iv).expect("sha256 output is 32 bytes");

        let mut upstream_reuse = [0u8; 48];
        upstream_reuse[..32].copy_from_slice(&enc_key);
        upstream_reuse[32..].copy_from_slice(&enc_iv);

        // `decryptor`'s counter has already advanced 4 blocks (64/16) from
        // decrypting the preamble above — keep this exact instance so the
        // wrapped reader picks up the keystream where the trial left it,
        // rather than a fresh cipher that would desync from byte 64 onward.
        return Ok(ClientAuth {
            reader: CryptoReader::new(rd, decryptor),
            writer: CryptoWriter::new(wr, encryptor),
            user: user.name.clone(),
            dc_index,
            upstream_reuse,
        });
    }

    Err(RelayError::HandshakeRejected)
}
