// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blob (image/file upload) metadata, MIME whitelists, and quotas.
//!
//! Blob ids encode their kind, a per-session ordinal, and a random suffix,
//! and preserve the extension: `img_003_ab12cd34.png`,
//! `file_017_9f00aa21.txt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::hex8;

/// Which blob store a blob lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    Image,
    File,
}

impl BlobKind {
    /// Subdirectory of the session holding this kind of blob.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::File => "files",
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::File => "file",
        }
    }
}

/// Broad class of an uploaded file; text files get a tighter size cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Text,
    Binary,
}

/// Metadata returned for a stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mime_type: String,
    pub size: u64,
    /// Set for files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    pub created_at: DateTime<Utc>,
}

// Per-file caps
pub const IMAGE_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const FILE_MAX_BYTES: u64 = 50 * 1024 * 1024;
pub const TEXT_FILE_MAX_BYTES: u64 = 1024 * 1024;

// Per-session caps
pub const IMAGE_MAX_COUNT: usize = 50;
pub const IMAGE_MAX_TOTAL_BYTES: u64 = 100 * 1024 * 1024;
pub const FILE_MAX_COUNT: usize = 100;
pub const FILE_MAX_TOTAL_BYTES: u64 = 500 * 1024 * 1024;

/// Supported image formats: MIME → canonical extension.
const IMAGE_TYPES: &[(&str, &str)] =
    &[("image/png", "png"), ("image/jpeg", "jpg"), ("image/gif", "gif"), ("image/webp", "webp")];

/// Supported file uploads: MIME → (canonical extension, category).
const FILE_TYPES: &[(&str, &str, FileCategory)] = &[
    ("text/plain", "txt", FileCategory::Text),
    ("text/markdown", "md", FileCategory::Text),
    ("text/csv", "csv", FileCategory::Text),
    ("text/html", "html", FileCategory::Text),
    ("text/xml", "xml", FileCategory::Text),
    ("application/json", "json", FileCategory::Text),
    ("application/yaml", "yaml", FileCategory::Text),
    ("application/toml", "toml", FileCategory::Text),
    ("application/pdf", "pdf", FileCategory::Binary),
    ("application/zip", "zip", FileCategory::Binary),
    ("application/gzip", "gz", FileCategory::Binary),
    ("application/x-tar", "tar", FileCategory::Binary),
];

/// Canonical extension for a whitelisted image MIME type.
pub fn image_extension(mime: &str) -> Option<&'static str> {
    IMAGE_TYPES.iter().find(|(m, _)| *m == mime).map(|(_, ext)| *ext)
}

/// Canonical extension and category for a whitelisted file MIME type.
pub fn file_type(mime: &str) -> Option<(&'static str, FileCategory)> {
    FILE_TYPES.iter().find(|(m, _, _)| *m == mime).map(|(_, ext, cat)| (*ext, *cat))
}

/// Reverse lookup used when listing a blob directory: extension → MIME.
pub fn mime_for_extension(kind: BlobKind, ext: &str) -> Option<&'static str> {
    match kind {
        BlobKind::Image => IMAGE_TYPES.iter().find(|(_, e)| *e == ext).map(|(m, _)| *m),
        BlobKind::File => FILE_TYPES.iter().find(|(_, e, _)| *e == ext).map(|(m, _, _)| *m),
    }
}

/// Category for a file extension, if whitelisted.
pub fn category_for_extension(ext: &str) -> Option<FileCategory> {
    FILE_TYPES.iter().find(|(_, e, _)| *e == ext).map(|(_, _, c)| *c)
}

/// Build a blob id: `<prefix>_NNN_<hex8>.<ext>`.
pub fn blob_id(kind: BlobKind, ordinal: usize, ext: &str) -> String {
    format!("{}_{:03}_{}.{}", kind.id_prefix(), ordinal, hex8(), ext)
}

/// Extension of a blob id (or any file name).
pub fn id_extension(id: &str) -> Option<&str> {
    id.rsplit_once('.').map(|(_, ext)| ext)
}

#[cfg(test)]
#[path = "blob_tests.rs"]
mod tests;
