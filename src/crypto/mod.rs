//! Cryptographic building blocks for pilfer.
//!
//! This module provides:
//! - The `VaultCodec` trait the session state machine encrypts through (`codec`)
//! - The Ansible Vault 1.1 envelope implementation (`ansible`)
//! - SHA-256 content digests for change detection (`digest`)

pub mod ansible;
pub mod codec;
pub mod digest;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{AnsibleVault, VaultCodec, content_hash};
pub use ansible::{AnsibleVault, VaultHeader, VAULT_MAGIC};
pub use codec::VaultCodec;
pub use digest::content_hash;
