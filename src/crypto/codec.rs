//! The cipher boundary used by the session state machine.
//!
//! Everything that reads or writes vault files goes through a
//! `VaultCodec`, so the controller never needs to know which envelope
//! format or key schedule sits behind it.

use crate::errors::Result;

/// Opaque encrypt/decrypt over raw byte buffers.
///
/// Implementations hold their secret for their whole lifetime; the
/// secret is resolved once and never mutated afterwards.
pub trait VaultCodec {
    /// Leading bytes that identify a file as encrypted by this codec.
    fn magic(&self) -> &'static [u8];

    /// Encrypt `plaintext`, returning the complete on-disk file contents.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt complete on-disk file contents back to the exact plaintext bytes.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Returns `true` if `bytes` starts with this codec's magic marker.
    fn is_vault(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(self.magic())
    }
}

impl<C: VaultCodec + ?Sized> VaultCodec for &C {
    fn magic(&self) -> &'static [u8] {
        (**self).magic()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        (**self).encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        (**self).decrypt(ciphertext)
    }
}
