//! On-disk storage for complaint photos.
//!
//! Files are path-addressed by the owning image's UUID (`<uuid>.<ext>`) in a
//! single flat directory, so no two records can ever point at the same file.
//! All I/O is blocking; callers run it off the async runtime.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf> {
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(base)
        .unwrap_or(target)
        .components()
    {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                return Err(StoreError::Storage("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(StoreError::Storage("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

/// Result of writing one image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the store root, as persisted in `complaint_images`.
    pub relative: String,
    pub size: usize,
    pub blake3_hash: String,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub fn new(base_path: PathBuf, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).map_err(|e| {
            StoreError::Storage(format!(
                "Failed to create image directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Image store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Write the bytes for image `id`.
    pub fn write(&self, id: Uuid, extension: &str, data: &[u8]) -> Result<StoredFile> {
        if data.is_empty() {
            return Err(StoreError::Storage("Empty image".to_string()));
        }
        if data.len() > self.max_size {
            return Err(StoreError::ImageTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let relative = format!("{}.{}", id, sanitize_extension(extension));
        let path = self.resolve(&relative)?;

        fs::write(&path, data)
            .map_err(|e| StoreError::Storage(format!("Failed to write image {}: {}", id, e)))?;

        debug!(id = %id, size = data.len(), file = %relative, "Stored image file");

        Ok(StoredFile {
            relative,
            size: data.len(),
            blake3_hash: blake3::hash(data).to_hex().to_string(),
        })
    }

    pub fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relative)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Storage(format!("Failed to read image {}: {}", relative, e)),
        })
    }

    /// Remove a stored file. A file that is already gone counts as removed.
    pub fn remove(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(file = %relative, "Removed image file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(file = %relative, "Image file already absent");
                Ok(())
            }
            Err(e) => Err(StoreError::Storage(format!(
                "Failed to delete image {}: {}",
                relative, e
            ))),
        }
    }

    /// Relative names of every file currently in the store.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StoreError::Storage(format!("Failed to list images: {}", e)))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                StoreError::Storage(format!("Failed to read directory entry: {}", e))
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Absolute path for a stored file, rejecting anything that escapes the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        if relative.is_empty() || relative.contains('/') || relative.contains('\\') {
            return Err(StoreError::Storage("Path traversal detected".to_string()));
        }
        ensure_within(&self.base_path, &self.base_path.join(relative))
    }
}

fn sanitize_extension(ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    if !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        ext.to_ascii_lowercase()
    } else {
        "img".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (ImageStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().join("images"), 1024).unwrap();
        (store, dir)
    }

    #[test]
    fn test_write_and_read() {
        let (store, _dir) = test_store();
        let id = Uuid::new_v4();

        let stored = store.write(id, "png", b"image-bytes").unwrap();
        assert_eq!(stored.relative, format!("{id}.png"));
        assert_eq!(stored.size, 11);
        assert_eq!(stored.blake3_hash, blake3::hash(b"image-bytes").to_hex().to_string());
        assert_eq!(store.read(&stored.relative).unwrap(), b"image-bytes");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, _dir) = test_store();
        let stored = store.write(Uuid::new_v4(), "jpg", b"delete-me").unwrap();

        store.remove(&stored.relative).unwrap();
        assert!(matches!(store.read(&stored.relative), Err(StoreError::NotFound)));
        store.remove(&stored.relative).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_size_cap_and_empty() {
        let (store, _dir) = test_store();
        assert!(matches!(
            store.write(Uuid::new_v4(), "png", &[0u8; 2048]),
            Err(StoreError::ImageTooLarge { size: 2048, max: 1024 })
        ));
        assert!(store.write(Uuid::new_v4(), "png", b"").is_err());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_traversal_rejected() {
        let (store, _dir) = test_store();
        assert!(store.resolve("../escape.png").is_err());
        assert!(store.resolve("..").is_err());
        assert!(store.read("sub/dir.png").is_err());
    }

    #[test]
    fn test_extension_sanitized() {
        let (store, _dir) = test_store();
        let id = Uuid::new_v4();
        let stored = store.write(id, "../../x", b"data").unwrap();
        assert_eq!(stored.relative, format!("{id}.img"));
        assert_eq!(sanitize_extension(".JPEG"), "jpeg");
    }
}
