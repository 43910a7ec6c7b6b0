//! Stream cipher wrappers.
//!
//! Two decorators — a decrypting reader and an encrypting writer — each hold
//! a mutable cipher slot. The slot starts out as a real [`CtrCipher`] and can
//! be swapped to the identity transform after construction (fast-mode
//! elision) without disturbing in-flight bytes.

use layer_crypto::CtrCipher;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A cipher slot: either a live keystream or the identity transform.
enum Slot {
    Real(CtrCipher),
    Identity,
}

impl Slot {
    fn transform(&mut self, buf: &mut [u8]) {
        if let Self::Real(c) = self {
            c.transform(buf);
        }
    }
}

/// Decrypts every byte read from the underlying stream.
pub struct CryptoReader<R> {
    inner: R,
    cipher: Slot,
}

impl<R: AsyncRead + Unpin> CryptoReader<R> {
    pub fn new(inner: R, cipher: CtrCipher) -> Self {
        Self { inner, cipher: Slot::Real(cipher) }
    }

    /// Swap in the identity transform: bytes pass through unmodified from
    /// this point on. Used by fast mode to elide upstream→client
    /// re-encryption.
    pub fn set_identity(&mut self) {
        self.cipher = Slot::Identity;
    }

    /// Read up to `buf.len()` bytes, decrypting in place. Returns `0` on EOF.
    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf).await?;
        self.cipher.transform(&mut buf[..n]);
        Ok(n)
    }

    /// Read exactly `buf.len()` bytes, decrypting in place.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.inner.read_exact(buf).await?;
        self.cipher.transform(buf);
        Ok(())
    }
}

/// Encrypts every byte written to the underlying stream.
pub struct CryptoWriter<W> {
    inner: W,
    cipher: Slot,
}

impl<W: AsyncWrite + Unpin> CryptoWriter<W> {
    pub fn new(inner: W, cipher: CtrCipher) -> Self {
        Self { inner, cipher: Slot::Real(cipher) }
    }

    /// Swap in the identity transform: bytes pass through unmodified from
    /// this point on. Used by fast mode to forward upstream ciphertext to
    /// the client verbatim.
    pub fn set_identity(&mut self) {
        self.cipher = Slot::Identity;
    }

    /// Encrypt `data` and write it in full.
    pub async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        let mut buf = data.to_vec();
        self.cipher.transform(&mut buf);
        self.inner.write_all(&buf).await
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }

    /// Signal EOF to the peer and close the underlying stream's write half.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_through_reader_and_writer() {
        let (client, server) = tokio::io::duplex(256);
        let (c_rd, c_wr) = tokio::io::split(client);
        let (s_rd, s_wr) = tokio::io::split(server);

        let key = [1u8; 32];
        let iv = [2u8; 16];
        let mut writer = CryptoWriter::new(c_wr, CtrCipher::new(&key, &iv).unwrap());
        let mut reader = CryptoReader::new(s_rd, CtrCipher::new(&key, &iv).unwrap());
        drop(c_rd);
        drop(s_wr);

        writer.write_all(b"hello obfuscated world").await.unwrap();
        writer.flush().await.unwrap();

        let mut buf = [0u8; 64];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello obfuscated world");
    }

    #[tokio::test]
    async fn identity_swap_forwards_ciphertext_unmodified() {
        let (client, server) = tokio::io::duplex(256);
        let (_c_rd, c_wr) = tokio::io::split(client);
        let (s_rd, _s_wr) = tokio::io::split(server);

        let mut writer = CryptoWriter::new(c_wr, CtrCipher::new(&[3u8; 32], &[4u8; 16]).unwrap());
        writer.set_identity();
        let mut reader = CryptoReader::new(s_rd, CtrCipher::new(&[5u8; 32], &[6u8; 16]).unwrap());
        reader.set_identity();

        let wire = [0xAAu8; 16];
        writer.write_all(&wire).await.unwrap();
        let mut buf = [0u8; 16];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, wire);
    }
}
