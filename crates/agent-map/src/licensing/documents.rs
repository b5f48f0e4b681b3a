//! Containment check and file access for stored form documents.
//!
//! Stored paths come from ingestion and may carry leading `../` segments or
//! Windows separators. Resolution works purely on path text: a symlink inside
//! the document root that points elsewhere is not detected.

use std::io;
use std::path::PathBuf;

use mime::Mime;

/// The stored path could not be placed under the document marker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored path '{stored}' escapes the document root")]
pub struct PathTraversalRejected {
    pub stored: String,
}

/// Relative path that starts with the marker and has no parent segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeDocumentPath(String);

impl SafeDocumentPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment, used as the download filename.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

/// File contents ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub file_name: String,
    pub media_type: Mime,
    pub bytes: Vec<u8>,
}

/// Place `stored_path` under `marker`, or reject it.
///
/// 1. Backslashes become `/`.
/// 2. A path already starting with the marker is kept.
/// 3. A marker found later in the path drops everything before it.
/// 4. A bare file name (no directories) gets the marker prepended.
///
/// The result must start with the marker and contain no `..`, `.` or empty
/// segments; anything else is a traversal attempt.
pub fn resolve(stored_path: &str, marker: &str) -> Result<SafeDocumentPath, PathTraversalRejected> {
    let rejected = || PathTraversalRejected {
        stored: stored_path.to_string(),
    };

    let normalized = stored_path.trim().replace('\\', "/");
    let marker = marker.trim_end_matches('/');
    if marker.is_empty() {
        return Err(rejected());
    }
    let prefix = format!("{marker}/");

    let candidate = if normalized.starts_with(&prefix) {
        normalized
    } else if let Some(index) = find_segment(&normalized, &prefix) {
        normalized[index..].to_string()
    } else if !normalized.is_empty() && !normalized.contains('/') {
        format!("{prefix}{normalized}")
    } else {
        return Err(rejected());
    };

    let contained = candidate.starts_with(&prefix)
        && candidate[prefix.len()..]
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."));
    if !contained {
        return Err(rejected());
    }

    Ok(SafeDocumentPath(candidate))
}

// Only matches the marker at a segment boundary, so `xstatic/Companies/`
// is not mistaken for the marker.
fn find_segment(path: &str, prefix: &str) -> Option<usize> {
    path.match_indices(prefix)
        .map(|(index, _)| index)
        .find(|&index| index == 0 || path.as_bytes()[index - 1] == b'/')
}

/// Resolves stored paths against a configured filesystem root.
#[derive(Debug, Clone)]
pub struct DocumentGate {
    root: PathBuf,
    marker: String,
}

impl DocumentGate {
    pub fn new(root: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            marker: marker.into(),
        }
    }

    pub fn resolve(&self, stored_path: &str) -> Result<SafeDocumentPath, PathTraversalRejected> {
        resolve(stored_path, &self.marker)
    }

    /// Reads the whole file. Only accepts paths that already passed `resolve`.
    pub fn open(&self, path: &SafeDocumentPath) -> io::Result<Document> {
        let full_path = path
            .as_str()
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment));
        let bytes = std::fs::read(full_path)?;
        Ok(Document {
            file_name: path.file_name().to_string(),
            media_type: mime::APPLICATION_PDF,
            bytes,
        })
    }
}
