//! Optional persistence of the negotiated key material
//!
//! Written after a successful handshake under fixed, well-known field names.
//! Nothing reads it back: sessions are never resumed from disk. The stored
//! copy is as sensitive as the in-memory key.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::SessionKeyMaterial;

/// Field name of the base64 session key
pub const PERSISTED_KEY_FIELD: &str = "aes_key";

/// Field name of the base64 session IV
pub const PERSISTED_IV_FIELD: &str = "aes_iv";

/// Destination for the session key after the handshake
pub trait KeyPersistence: Send + Sync {
    fn store(&self, material: &SessionKeyMaterial) -> std::io::Result<()>;
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct PersistedKey {
    aes_key: String,
    aes_iv: String,
}

/// Stores the key as a small JSON document on disk
#[derive(Debug, Clone)]
pub struct FileKeyPersistence {
    path: PathBuf,
}

impl FileKeyPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyPersistence for FileKeyPersistence {
    fn store(&self, material: &SessionKeyMaterial) -> std::io::Result<()> {
        let record = PersistedKey {
            aes_key: material.key_text(),
            aes_iv: material.iv_text(),
        };
        let mut json = serde_json::to_vec_pretty(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let result = options
            .open(&self.path)
            .and_then(|mut file| file.write_all(&json));
        json.zeroize();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_persistence_writes_well_known_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = FileKeyPersistence::new(&path);
        let material = SessionKeyMaterial::generate();

        store.store(&material).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value[PERSISTED_KEY_FIELD], material.key_text());
        assert_eq!(value[PERSISTED_IV_FIELD], material.iv_text());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileKeyPersistence::new(&path)
            .store(&SessionKeyMaterial::generate())
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
