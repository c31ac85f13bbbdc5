//! Ansible Vault (format 1.1) envelope.
//!
//! A vault file looks like this:
//!
//! ```text
//! $ANSIBLE_VAULT;1.1;AES256
//! 6231336539633839...   (hex, wrapped at 80 columns)
//! ```
//!
//! The hex body decodes to three newline-separated hex fields:
//! `salt`, `hmac` and `ciphertext`.  Keys come from PBKDF2-HMAC-SHA256
//! (10 000 rounds) over the password and the 32-byte salt, yielding
//! 80 bytes: AES-256 key, HMAC-SHA256 key, CTR initial counter.
//! The plaintext is PKCS#7 padded to 16 bytes and encrypted with
//! AES-256-CTR; the HMAC covers the ciphertext only.
//!
//! Format 1.2 adds a fourth header field (the vault id).  It is
//! accepted on decrypt and ignored; new files are always written as 1.1.

use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::codec::VaultCodec;
use crate::errors::{PilferError, Result};

/// Leading bytes of every Ansible Vault file.
pub const VAULT_MAGIC: &[u8] = b"$ANSIBLE_VAULT;";

/// First header field.
const HEADER_TAG: &str = "$ANSIBLE_VAULT";

/// Version written by `encrypt`.
const WRITE_VERSION: &str = "1.1";

/// The only cipher Ansible has ever shipped for format 1.x.
const CIPHER_NAME: &str = "AES256";

/// PBKDF2 iteration count fixed by the format.
const PBKDF2_ROUNDS: u32 = 10_000;

/// Salt length in bytes.
const SALT_LEN: usize = 32;

/// Derived key material: 32 (AES key) + 32 (HMAC key) + 16 (IV).
const KEY_MATERIAL_LEN: usize = 80;

/// AES block size, used for PKCS#7 padding.
const BLOCK_LEN: usize = 16;

/// Column width of the hex body.
const LINE_WIDTH: usize = 80;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Parsed first line of a vault file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHeader {
    pub version: String,
    pub cipher: String,
    /// Only present for format 1.2.
    pub vault_id: Option<String>,
}

impl VaultHeader {
    /// Parse a header line such as `$ANSIBLE_VAULT;1.2;AES256;prod`.
    pub fn parse(line: &[u8]) -> Result<Self> {
        let line = std::str::from_utf8(line)
            .map_err(|_| PilferError::InvalidVaultFormat("header is not valid UTF-8".into()))?
            .trim();

        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() < 3 || fields[0] != HEADER_TAG {
            return Err(PilferError::InvalidVaultFormat(format!(
                "malformed header '{line}'"
            )));
        }

        let version = fields[1];
        if version != "1.1" && version != "1.2" {
            return Err(PilferError::InvalidVaultFormat(format!(
                "unsupported vault version {version}"
            )));
        }

        let cipher = fields[2];
        if cipher != CIPHER_NAME {
            return Err(PilferError::InvalidVaultFormat(format!(
                "unsupported cipher {cipher}"
            )));
        }

        let vault_id = fields
            .get(3)
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string());

        Ok(Self {
            version: version.to_string(),
            cipher: cipher.to_string(),
            vault_id,
        })
    }
}

/// The Ansible Vault codec, bound to a single password.
pub struct AnsibleVault {
    password: Zeroizing<Vec<u8>>,
}

impl AnsibleVault {
    /// Create a codec for `password`.
    pub fn new(password: &[u8]) -> Self {
        Self {
            password: Zeroizing::new(password.to_vec()),
        }
    }

    /// Run PBKDF2 over the password and `salt`.
    fn derive(&self, salt: &[u8]) -> KeyMaterial {
        let mut bytes = Zeroizing::new([0u8; KEY_MATERIAL_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(&self.password, salt, PBKDF2_ROUNDS, &mut bytes[..]);
        KeyMaterial { bytes }
    }
}

impl VaultCodec for AnsibleVault {
    fn magic(&self) -> &'static [u8] {
        VAULT_MAGIC
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);

        let keys = self.derive(&salt);

        let mut buf = pkcs7_pad(plaintext);
        let mut cipher = Aes256Ctr::new_from_slices(keys.cipher_key(), keys.iv())
            .map_err(|e| PilferError::EncryptionFailed(format!("invalid key length: {e}")))?;
        cipher.apply_keystream(&mut buf);

        let mut mac = Hmac::<Sha256>::new_from_slice(keys.hmac_key())
            .map_err(|e| PilferError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;
        mac.update(&buf);
        let tag = mac.finalize().into_bytes();

        let inner = format!(
            "{}\n{}\n{}",
            hex::encode(salt),
            hex::encode(tag),
            hex::encode(&buf)
        );
        let body = hex::encode(inner.as_bytes());

        let mut out = Vec::with_capacity(body.len() + body.len() / LINE_WIDTH + 32);
        out.extend_from_slice(format!("{HEADER_TAG};{WRITE_VERSION};{CIPHER_NAME}\n").as_bytes());
        for line in body.as_bytes().chunks(LINE_WIDTH) {
            out.extend_from_slice(line);
            out.push(b'\n');
        }
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if !ciphertext.starts_with(VAULT_MAGIC) {
            return Err(PilferError::InvalidVaultFormat(
                "missing $ANSIBLE_VAULT header".into(),
            ));
        }

        let (header_line, rest) = match ciphertext.iter().position(|&b| b == b'\n') {
            Some(i) => (&ciphertext[..i], &ciphertext[i + 1..]),
            None => (ciphertext, &[][..]),
        };
        VaultHeader::parse(header_line)?;

        let hex_body: Vec<u8> = rest
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let body = hex::decode(&hex_body)
            .map_err(|e| PilferError::InvalidVaultFormat(format!("body is not hex: {e}")))?;

        let mut fields = body.splitn(3, |&b| b == b'\n');
        let salt = decode_field(fields.next(), "salt")?;
        let expected_tag = decode_field(fields.next(), "hmac")?;
        let mut buf = decode_field(fields.next(), "ciphertext")?;

        let keys = self.derive(&salt);

        let mut mac = Hmac::<Sha256>::new_from_slice(keys.hmac_key())
            .map_err(|e| PilferError::DecryptionFailed(format!("invalid HMAC key: {e}")))?;
        mac.update(&buf);
        mac.verify_slice(&expected_tag).map_err(|_| {
            PilferError::DecryptionFailed("HMAC mismatch: wrong password or corrupted data".into())
        })?;

        let mut cipher = Aes256Ctr::new_from_slices(keys.cipher_key(), keys.iv())
            .map_err(|e| PilferError::DecryptionFailed(format!("invalid key length: {e}")))?;
        cipher.apply_keystream(&mut buf);

        pkcs7_unpad(buf)
    }
}

/// 80 bytes of PBKDF2 output, wiped on drop.
struct KeyMaterial {
    bytes: Zeroizing<[u8; KEY_MATERIAL_LEN]>,
}

impl KeyMaterial {
    fn cipher_key(&self) -> &[u8] {
        &self.bytes[..32]
    }

    fn hmac_key(&self) -> &[u8] {
        &self.bytes[32..64]
    }

    fn iv(&self) -> &[u8] {
        &self.bytes[64..]
    }
}

fn decode_field(field: Option<&[u8]>, name: &str) -> Result<Vec<u8>> {
    let field = field.ok_or_else(|| {
        PilferError::InvalidVaultFormat(format!("vault body is missing the {name} field"))
    })?;
    hex::decode(field)
        .map_err(|e| PilferError::InvalidVaultFormat(format!("{name} field is not hex: {e}")))
}

/// PKCS#7: always appends 1..=16 bytes, each equal to the pad length.
fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_LEN - data.len() % BLOCK_LEN;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.resize(data.len() + pad, pad as u8);
    out
}

fn pkcs7_unpad(mut data: Vec<u8>) -> Result<Vec<u8>> {
    let bad_padding = || PilferError::DecryptionFailed("invalid padding".into());

    let pad = usize::from(*data.last().ok_or_else(bad_padding)?);
    if pad == 0 || pad > BLOCK_LEN || pad > data.len() {
        return Err(bad_padding());
    }
    if !data[data.len() - pad..].iter().all(|&b| usize::from(b) == pad) {
        return Err(bad_padding());
    }

    data.truncate(data.len() - pad);
    Ok(data)
}
