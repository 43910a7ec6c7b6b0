//! AES-CTR keystream used by the obfuscated2 handshake and the per-direction
//! stream wrappers built on top of it.

use aes::cipher::{generic_array::GenericArray, KeyIvInit, StreamCipher};

/// Error constructing a [`CtrCipher`] from key material of the wrong length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidKeyLength(pub usize);

impl std::fmt::Display for InvalidKeyLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AES key must be 16 or 32 bytes, got {}", self.0)
    }
}
impl std::error::Error for InvalidKeyLength {}

/// A stateful AES-CTR keystream, 128-bit counter, initialised from a
/// big-endian IV.
///
/// `transform` is its own inverse (XOR) and advances the counter by
/// `ceil(len / 16)` blocks, so keystream position is preserved across calls
/// regardless of chunk boundaries.
pub enum CtrCipher {
    Aes128(ctr::Ctr128BE<aes::Aes128>),
    Aes256(ctr::Ctr128BE<aes::Aes256>),
}

impl CtrCipher {
    /// Build a cipher from a 16-byte (AES-128) or 32-byte (AES-256) key and
    /// a 16-byte big-endian counter seed.
    pub fn new(key: &[u8], iv: &[u8; 16]) -> Result<Self, InvalidKeyLength> {
        match key.len() {
            16 => Ok(Self::Aes128(ctr::Ctr128BE::<aes::Aes128>::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(iv),
            ))),
            32 => Ok(Self::Aes256(ctr::Ctr128BE::<aes::Aes256>::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(iv),
            ))),
            n => Err(InvalidKeyLength(n)),
        }
    }

    /// XOR `buf` with the keystream in place, advancing the counter.
    pub fn transform(&mut self, buf: &mut [u8]) {
        match self {
            Self::Aes128(c) => c.apply_keystream(buf),
            Self::Aes256(c) => c.apply_keystream(buf),
        }
    }
}

/// Derive a 32-byte AES-256 key from obfuscation prekey material and a
/// user's shared secret: `SHA-256(prekey || secret)`.
pub fn derive_key(prekey: &[u8], secret: &[u8]) -> [u8; 32] {
    crate::sha256!(prekey, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_is_its_own_inverse_across_chunk_boundaries() {
        let key = [7u8; 32];
        let iv = [3u8; 16];
        let plaintext: Vec<u8> = (0..200u16).map(|x| (x % 251) as u8).collect();

        let mut enc = CtrCipher::new(&key, &iv).unwrap();
        let mut ciphertext = plaintext.clone();
        // split across three uneven calls to exercise keystream continuity
        enc.transform(&mut ciphertext[..5]);
        enc.transform(&mut ciphertext[5..130]);
        enc.transform(&mut ciphertext[130..]);

        let mut dec = CtrCipher::new(&key, &iv).unwrap();
        let mut roundtrip = ciphertext.clone();
        dec.transform(&mut roundtrip[..17]);
        dec.transform(&mut roundtrip[17..]);

        assert_eq!(roundtrip, plaintext);
    }

    #[test]
    fn rejects_bad_key_length() {
        assert!(CtrCipher::new(&[0u8; 24], &[0u8; 16]).is_err());
    }

    #[test]
    fn derive_key_matches_sha256_concat() {
        use sha2::{Digest, Sha256};
        let prekey = [1u8; 32];
        let secret = [2u8; 16];
        let mut h = Sha256::new();
        h.update(prekey);
        h.update(secret);
        let expect: [u8; 32] = h.finalize().into();
        assert_eq!(derive_key(&prekey, &secret), expect);
    }
}
