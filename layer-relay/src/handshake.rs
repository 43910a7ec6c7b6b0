//! Shared constants and key-derivation helpers for the obfuscated2 preamble.

pub const SKIP_LEN: usize = 8;
pub const PREKEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const HANDSHAKE_LEN: usize = 64;
pub const MAGIC_VAL_POS: usize = 56;
pub const MAGIC: [u8; 4] = [0xef, 0xef, 0xef, 0xef];

/// Derive `(key, iv)` from a 48-byte `prekey || iv` span and a user secret.
///
/// `key = SHA-256(prekey || secret)`, `iv` is the trailing 16 bytes verbatim.
pub fn keys_from_prekey_iv(prekey_iv: &[u8], secret: &[u8; 16]) -> ([u8; 32], [u8; 16]) {
    debug_assert_eq!(prekey_iv.len(), PREKEY_LEN + IV_LEN);
    let key = layer_crypto::derive_key(&prekey_iv[..PREKEY_LEN], secret);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&prekey_iv[PREKEY_LEN..]);
    (key, iv)
}

/// Byte-reverse a 48-byte `prekey || iv` span, as required to derive the
/// opposite direction's keys from the same handshake bytes.
pub fn reverse48(prekey_iv: &[u8]) -> Vec<u8> {
    let mut rev = prekey_iv.to_vec();
    rev.reverse();
    rev
}

/// Split a 48-byte `key || iv` span into `(key, iv)` verbatim, with no
/// hashing or secret mixing.
///
/// Used by the upstream handshake: unlike the client handshake, the
/// preamble bytes *are* the AES key material the datacenter expects — there
/// is no shared secret to mix in on that side.
pub fn raw_key_iv(key_iv: &[u8]) -> ([u8; 32], [u8; 16]) {
    debug_assert_eq!(key_iv.len(), PREKEY_LEN + IV_LEN);
    let mut key = [0u8; 32];
    key.copy_from_slice(&key_iv[..32]);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&key_iv[32..]);
    (key, iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_of_reverse_is_identity() {
        let span: Vec<u8> = (0..48u8).collect();
        assert_eq!(reverse48(&reverse48(&span)), span);
    }

    #[test]
    fn keys_independent_of_direction() {
        // The forward and reversed derivations are expected to diverge for
        // almost every input.
        let span: Vec<u8> = (0..48u8).collect();
        let secret = [9u8; 16];
        let (k1, iv1) = keys_from_prekey_iv(&span, &secret);
        let (k2, iv2) = keys_from_prekey_iv(&reverse48(&span), &secret);
        assert_ne!((k1, iv1), (k2, iv2));
    }
}
