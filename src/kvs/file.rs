//! Directory-backed key-value store.
//!
//! Each key is stored as one flat file directly under the store root, named
//! exactly like the key. There are no subdirectories and no sidecar metadata.
//! Every public operation holds the store lock for its whole duration.

use super::config::{CapacityCheck, StoreConfig, TEMP_DIR_PREFIX};
use super::Kvs;
use crate::error::{Error, Result};

use std::fs::{self, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A key-value store persisting each entry as a file under a root directory.
///
/// ```rust
/// use dewy::kvs::{File, Kvs, StoreConfig};
///
/// # fn example() -> Result<(), dewy::Error> {
/// let store = File::new(StoreConfig::default())?;
/// store.write("v1", b"release")?;
/// assert!(store.write("v1", b"other").is_err());
/// store.delete("v1")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct File {
    root: PathBuf,
    max_size: u64,
    capacity_check: CapacityCheck,
    /// Bytes held by cached files. Also serves as the store lock.
    usage: Mutex<u64>,
}

impl File {
    /// Creates a store from `config`.
    ///
    /// The configured root is created if missing; without one, a fresh
    /// temporary directory prefixed with `dewy-` is created and kept.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let root = match config.directory {
            Some(dir) => {
                fs::create_dir_all(&dir).map_err(|source| Error::Initialization {
                    path: Some(dir.clone()),
                    source,
                })?;
                dir
            }
            None => tempfile::Builder::new()
                .prefix(TEMP_DIR_PREFIX)
                .tempdir()
                .map_err(|source| Error::Initialization { path: None, source })?
                .keep(),
        };

        let usage = content_size(&root).map_err(|source| Error::Initialization {
            path: Some(root.clone()),
            source,
        })?;

        debug!(
            "Opened store at {:?} ({} bytes cached, ceiling {} bytes)",
            root, usage, config.max_size
        );

        Ok(Self {
            root,
            max_size: config.max_size,
            capacity_check: config.capacity_check,
            usage: Mutex::new(usage),
        })
    }

    /// Gets the root directory of the store.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Gets the path of the file backing `key`.
    ///
    /// The key is validated but its presence is not checked.
    pub fn path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Gets the configured size ceiling, in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Gets the configured capacity check.
    pub fn capacity_check(&self) -> CapacityCheck {
        self.capacity_check
    }

    /// Gets the number of bytes currently accounted to cached files.
    pub fn usage(&self) -> u64 {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        // The guarded counter is updated only after each filesystem call
        // succeeds, so a poisoned lock still holds a consistent value.
        self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn root_metadata(&self) -> Result<Metadata> {
        let metadata = fs::metadata(&self.root).map_err(|source| Error::RootUnavailable {
            path: self.root.clone(),
            reason: "cannot stat the root directory".into(),
            source: Some(source),
        })?;
        if !metadata.is_dir() {
            return Err(Error::RootUnavailable {
                path: self.root.clone(),
                reason: "the root is not a directory".into(),
                source: None,
            });
        }
        Ok(metadata)
    }

    fn check_capacity(&self, root: &Metadata, usage: u64, incoming: u64) -> Result<()> {
        let (size, exceeded) = match self.capacity_check {
            // A counter already past the ceiling refuses even empty payloads.
            CapacityCheck::Tracked => (usage, usage.saturating_add(incoming) > self.max_size),
            CapacityCheck::DirectorySize => (root.len(), root.len() > self.max_size),
        };
        if exceeded {
            return Err(Error::CapacityExceeded {
                size,
                max_size: self.max_size,
            });
        }
        Ok(())
    }
}

impl Kvs for File {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let _guard = self.lock();
        let path = self.path(key)?;
        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::KeyNotFound(key.into())),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut usage = self.lock();
        let path = self.path(key)?;
        let root = self.root_metadata()?;
        self.check_capacity(&root, *usage, data.len() as u64)?;

        if exists(&path)? {
            return Err(Error::KeyAlreadyExists(key.into()));
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::KeyAlreadyExists(key.into()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = file.write_all(data).and_then(|_| file.sync_all()) {
            drop(file);
            // A half-written entry must not be readable under its key.
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        *usage += data.len() as u64;
        debug!("Cached {} bytes under {:?}", data.len(), key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut usage = self.lock();
        let path = self.path(key)?;
        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::KeyNotFound(key.into()));
            }
            Err(e) => return Err(e.into()),
        };

        fs::remove_file(&path)?;

        if metadata.is_file() {
            *usage = usage.saturating_sub(metadata.len());
        }
        debug!("Deleted {:?} from the store", key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let _guard = self.lock();
        let entries = fs::read_dir(&self.root).map_err(|source| Error::RootUnavailable {
            path: self.root.clone(),
            reason: "cannot list the root directory".into(),
            source: Some(source),
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            // Only UTF-8 names can be addressed as keys.
            match entry?.file_name().into_string() {
                Ok(key) => keys.push(key),
                Err(name) => debug!("Skipping non UTF-8 entry {:?}", name),
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        let _guard = self.lock();
        exists(&self.path(key)?)
    }
}

/// Rejects keys that are not a single plain file name.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key == "." || key == ".." {
        "key refers to a directory"
    } else if key.contains(['/', '\\']) {
        "key contains a path separator"
    } else if key.contains('\0') {
        "key contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(Error::InvalidKey {
        key: key.into(),
        reason,
    })
}

fn exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Sums the sizes of the regular files directly under `root`.
fn content_size(root: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(root)? {
        let metadata = entry?.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_plain_names() {
        assert!(validate_key("v1.2.3").is_ok());
        assert!(validate_key("app_linux_amd64.zip").is_ok());
        assert!(validate_key("..hidden").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        for key in ["", ".", "..", "../etc", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_key(key), Err(Error::InvalidKey { .. })),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_content_size_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), [0u8; 10]).unwrap();
        fs::write(dir.path().join("b"), [0u8; 5]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c"), [0u8; 100]).unwrap();

        assert_eq!(content_size(dir.path()).unwrap(), 15);
    }

    #[test]
    fn test_new_seeds_usage_from_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("v0"), [1u8; 42]).unwrap();

        let store = File::new(StoreConfig {
            directory: Some(dir.path().to_path_buf()),
            ..StoreConfig::default()
        })
        .unwrap();

        assert_eq!(store.usage(), 42);
    }
}
