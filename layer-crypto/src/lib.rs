//! Cryptographic primitives for the MTProto obfuscated2 transport.
//!
//! Provides:
//! - a stateful AES-128/256-CTR keystream ([`CtrCipher`])
//! - the `SHA-256(prekey || secret)` key derivation used by the handshake
//! - a `sha256!` convenience macro for hashing concatenated byte slices

#![deny(unsafe_code)]

mod ctr_cipher;
mod sha;

pub use ctr_cipher::{derive_key, CtrCipher, InvalidKeyLength};
