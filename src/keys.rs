//! Symmetric key material shared with the transport layer.
//!
//! The key is 32 random bytes persisted as hex in a single file. The first
//! call generates and writes it; later calls (and later processes) read the
//! same key back. The core never uses the key itself.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::info;

use crate::error::PrivacyError;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// A stable symmetric key.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

impl KeyMaterial {
    /// Generate a fresh key from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Decode a key from its persisted hex form.
    pub fn from_hex(encoded: &str) -> Result<Self, PrivacyError> {
        let decoded = hex::decode(encoded.trim())
            .map_err(|e| PrivacyError::KeyMaterial(format!("invalid key encoding: {}", e)))?;
        let bytes: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            PrivacyError::KeyMaterial(format!("expected {} key bytes, found {}", KEY_LEN, v.len()))
        })?;
        Ok(Self { bytes })
    }

    /// Persisted hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Read the key at `path`, creating and persisting a new one if the
    /// file does not exist.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, PrivacyError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_hex(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let key = Self::generate();
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, key.to_hex())?;
                info!(path = %path.display(), "generated new key material");
                Ok(key)
            }
            Err(e) => Err(e.into()),
        }
    }
}
