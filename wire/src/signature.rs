//! Shared-secret key derivation and packet signatures.

use std::fmt;

use sha1::{Digest, Sha1};

use crate::header::{SIGNATURE_LEN, SIGNED_PREFIX_LEN};

/// A packet signature (SHA-1 digest).
pub type Signature = [u8; SIGNATURE_LEN];

/// Pre-hashed shared secret of one tunnel.
///
/// The plaintext secret is hashed once; only the digest takes part in
/// packet signatures and it is never put on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey([u8; SIGNATURE_LEN]);

impl SharedKey {
    /// Derives the key from the tunnel password.
    #[must_use]
    pub fn derive(secret: &str) -> Self {
        Self(Sha1::digest(secret.as_bytes()).into())
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedKey(..)")
    }
}

/// Signs `prefix ++ key ++ payload`.
#[must_use]
pub fn sign(prefix: &[u8; SIGNED_PREFIX_LEN], key: &SharedKey, payload: &[u8]) -> Signature {
    let mut hasher = Sha1::new();
    hasher.update(prefix);
    hasher.update(key.as_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}
