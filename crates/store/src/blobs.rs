// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session binary blobs: uploaded images and files.
//!
//! Blobs live as opaque content files under `images/` and `files/`, named by
//! their blob id. Writes validate MIME against a whitelist and enforce
//! per-file size plus per-session count and aggregate-byte quotas; listings
//! infer MIME back from the extension.

use crate::error::StoreError;
use crate::store::SessionStore;
use chrono::{DateTime, Duration, Utc};
use mitto_core::blob::{
    self, blob_id, BlobInfo, BlobKind, FileCategory, FILE_MAX_BYTES, FILE_MAX_COUNT,
    FILE_MAX_TOTAL_BYTES, IMAGE_MAX_BYTES, IMAGE_MAX_COUNT, IMAGE_MAX_TOTAL_BYTES,
    TEXT_FILE_MAX_BYTES,
};
use mitto_core::clock::Clock;
use mitto_core::session::SessionId;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Count and aggregate size of the regular files in a blob directory.
fn dir_usage(dir: &Path) -> Result<(usize, u64), StoreError> {
    let mut count = 0usize;
    let mut bytes = 0u64;
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = entry?;
                let meta = entry.metadata()?;
                if meta.is_file() {
                    count += 1;
                    bytes += meta.len();
                }
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    Ok((count, bytes))
}

fn set_blob_permissions(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

impl<C: Clock> SessionStore<C> {
    // -- images --

    /// Store an uploaded image and return its info record.
    pub fn save_image(
        &self,
        id: &SessionId,
        data: &[u8],
        name: Option<&str>,
        mime_type: &str,
    ) -> Result<BlobInfo, StoreError> {
        let _guard = self.write_guard()?;
        if !self.session_dir(id).is_dir() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }

        let Some(ext) = blob::image_extension(mime_type) else {
            return Err(StoreError::UnsupportedFormat(mime_type.to_string()));
        };
        let size = data.len() as u64;
        if size > IMAGE_MAX_BYTES {
            return Err(StoreError::ImageTooLarge { size, max: IMAGE_MAX_BYTES });
        }

        let dir = self.blob_dir(id, BlobKind::Image);
        let (count, bytes) = dir_usage(&dir)?;
        if count >= IMAGE_MAX_COUNT {
            return Err(StoreError::SessionImageLimit { max: IMAGE_MAX_COUNT });
        }
        if bytes + size > IMAGE_MAX_TOTAL_BYTES {
            return Err(StoreError::SessionStorageLimit { max: IMAGE_MAX_TOTAL_BYTES });
        }

        let info = self.write_blob(&dir, BlobKind::Image, count + 1, ext, data, name)?;
        Ok(BlobInfo { category: None, ..info })
    }

    /// Absolute path of a stored image.
    pub fn get_image_path(&self, id: &SessionId, image_id: &str) -> Result<PathBuf, StoreError> {
        let _guard = self.read_guard()?;
        let path = self.blob_dir(id, BlobKind::Image).join(image_id);
        if !path.is_file() {
            return Err(StoreError::ImageNotFound(image_id.to_string()));
        }
        Ok(path)
    }

    /// All stored images, oldest first (by modification time).
    pub fn list_images(&self, id: &SessionId) -> Result<Vec<BlobInfo>, StoreError> {
        let _guard = self.read_guard()?;
        self.list_blobs(id, BlobKind::Image)
    }

    pub fn delete_image(&self, id: &SessionId, image_id: &str) -> Result<(), StoreError> {
        let _guard = self.write_guard()?;
        let path = self.blob_dir(id, BlobKind::Image).join(image_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::ImageNotFound(image_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remove images older than `max_age` from sessions idle longer than
    /// `preserve_recent`. Returns blobs removed; per-session failures skip.
    pub fn cleanup_old_images(
        &self,
        max_age: Duration,
        preserve_recent: Duration,
    ) -> Result<usize, StoreError> {
        self.cleanup_old_blobs(BlobKind::Image, max_age, preserve_recent)
    }

    // -- files --

    /// Store an uploaded file and return its info record.
    pub fn save_file(
        &self,
        id: &SessionId,
        data: &[u8],
        name: Option<&str>,
        mime_type: &str,
    ) -> Result<BlobInfo, StoreError> {
        let _guard = self.write_guard()?;
        if !self.session_dir(id).is_dir() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }

        let Some((ext, category)) = blob::file_type(mime_type) else {
            return Err(StoreError::UnsupportedFileType(mime_type.to_string()));
        };
        let size = data.len() as u64;
        let per_file_max = match category {
            FileCategory::Text => TEXT_FILE_MAX_BYTES,
            FileCategory::Binary => FILE_MAX_BYTES,
        };
        if size > per_file_max {
            return Err(StoreError::FileTooLarge { size, max: per_file_max });
        }

        let dir = self.blob_dir(id, BlobKind::File);
        let (count, bytes) = dir_usage(&dir)?;
        if count >= FILE_MAX_COUNT {
            return Err(StoreError::SessionFileLimit { max: FILE_MAX_COUNT });
        }
        if bytes + size > FILE_MAX_TOTAL_BYTES {
            return Err(StoreError::SessionFileStorageLimit { max: FILE_MAX_TOTAL_BYTES });
        }

        let info = self.write_blob(&dir, BlobKind::File, count + 1, ext, data, name)?;
        Ok(BlobInfo { category: Some(category), ..info })
    }

    /// Absolute path of a stored file.
    pub fn get_file_path(&self, id: &SessionId, file_id: &str) -> Result<PathBuf, StoreError> {
        let _guard = self.read_guard()?;
        let path = self.blob_dir(id, BlobKind::File).join(file_id);
        if !path.is_file() {
            return Err(StoreError::FileNotFound(file_id.to_string()));
        }
        Ok(path)
    }

    /// All stored files, oldest first (by modification time).
    pub fn list_files(&self, id: &SessionId) -> Result<Vec<BlobInfo>, StoreError> {
        let _guard = self.read_guard()?;
        self.list_blobs(id, BlobKind::File)
    }

    pub fn delete_file(&self, id: &SessionId, file_id: &str) -> Result<(), StoreError> {
        let _guard = self.write_guard()?;
        let path = self.blob_dir(id, BlobKind::File).join(file_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::FileNotFound(file_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// File-blob variant of [`cleanup_old_images`](Self::cleanup_old_images).
    pub fn cleanup_old_files(
        &self,
        max_age: Duration,
        preserve_recent: Duration,
    ) -> Result<usize, StoreError> {
        self.cleanup_old_blobs(BlobKind::File, max_age, preserve_recent)
    }

    // -- shared --

    fn write_blob(
        &self,
        dir: &Path,
        kind: BlobKind,
        ordinal: usize,
        ext: &str,
        data: &[u8],
        name: Option<&str>,
    ) -> Result<BlobInfo, StoreError> {
        fs::create_dir_all(dir)?;
        let blob_id = blob_id(kind, ordinal, ext);
        let path = dir.join(&blob_id);
        fs::write(&path, data)?;
        set_blob_permissions(&path)?;

        Ok(BlobInfo {
            id: blob_id,
            name: name.map(str::to_string),
            mime_type: blob::mime_for_extension(kind, ext)
                .unwrap_or("application/octet-stream")
                .to_string(),
            size: data.len() as u64,
            category: None,
            created_at: self.now(),
        })
    }

    pub(crate) fn list_blobs(
        &self,
        id: &SessionId,
        kind: BlobKind,
    ) -> Result<Vec<BlobInfo>, StoreError> {
        if !self.session_dir(id).is_dir() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }

        let dir = self.blob_dir(id, kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut blobs: Vec<(SystemTime, BlobInfo)> = Vec::new();
        for entry in entries {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let blob_id = entry.file_name().to_string_lossy().into_owned();
            let ext = blob::id_extension(&blob_id).unwrap_or("");
            let modified = meta.modified()?;
            blobs.push((
                modified,
                BlobInfo {
                    mime_type: blob::mime_for_extension(kind, ext)
                        .unwrap_or("application/octet-stream")
                        .to_string(),
                    category: match kind {
                        BlobKind::Image => None,
                        BlobKind::File => blob::category_for_extension(ext),
                    },
                    size: meta.len(),
                    created_at: DateTime::<Utc>::from(modified),
                    name: None,
                    id: blob_id,
                },
            ));
        }
        blobs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(blobs.into_iter().map(|(_, info)| info).collect())
    }

    fn cleanup_old_blobs(
        &self,
        kind: BlobKind,
        max_age: Duration,
        preserve_recent: Duration,
    ) -> Result<usize, StoreError> {
        let now = self.now();
        let sessions = self.list()?;
        let _guard = self.write_guard()?;

        let mut removed = 0usize;
        for meta in sessions {
            if now - meta.updated_at <= preserve_recent {
                continue;
            }
            let dir = self.blob_dir(&meta.session_id, kind);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    tracing::warn!(session_id = %meta.session_id, %err, "blob cleanup skipped session");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let Ok(file_meta) = entry.metadata() else { continue };
                let Ok(modified) = file_meta.modified() else { continue };
                if now - DateTime::<Utc>::from(modified) > max_age {
                    match fs::remove_file(entry.path()) {
                        Ok(()) => removed += 1,
                        Err(err) => {
                            tracing::warn!(path = %entry.path().display(), %err, "blob removal failed");
                        }
                    }
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "blobs_tests.rs"]
mod tests;
