//! Scoped staging of file attachments.
//!
//! Selecting a file for attachment acquires a real handle to it (open +
//! stat); the handle lives only for the duration of the add/update form.
//! Callers release handles explicitly, either one at a time (`remove`),
//! all at once (`discard`, the form-close path), or by committing the set
//! into persisted metadata records. Dropping the set releases anything
//! still staged so a bailed-out form cannot leak handles.
//!
//! Only metadata ever reaches the store; binary content is never persisted.

use std::fs::File;
use std::path::Path;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::task::Attachment;

/// Per-file size ceiling, matching the 200 MB form limit.
pub const MAX_ATTACHMENT_BYTES: u64 = 200 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("{name}: file size must be less than 200MB ({size} bytes)")]
    TooLarge { name: String, size: u64 },
    #[error("{name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no staged attachment with id {0}")]
    NotStaged(Uuid),
}

/// One selected file: persisted-to-be metadata plus the live handle.
#[derive(Debug)]
pub struct StagedAttachment {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub mime: String,
    // Held open for the lifetime of the staging; closing it is the release.
    _handle: File,
}

/// The set of files currently selected on a task form.
#[derive(Debug, Default)]
pub struct StagedAttachments {
    staged: Vec<StagedAttachment>,
}

impl StagedAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a handle to `path` and stage it, enforcing the per-file
    /// size limit. A rejected file leaves previously staged files intact.
    pub fn stage(&mut self, path: &Path) -> Result<Uuid, AttachError> {
        self.stage_with_limit(path, MAX_ATTACHMENT_BYTES)
    }

    fn stage_with_limit(&mut self, path: &Path, limit: u64) -> Result<Uuid, AttachError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let handle = File::open(path).map_err(|source| AttachError::Unreadable {
            name: name.clone(),
            source,
        })?;
        let size = handle
            .metadata()
            .map_err(|source| AttachError::Unreadable {
                name: name.clone(),
                source,
            })?
            .len();
        if size > limit {
            return Err(AttachError::TooLarge { name, size });
        }
        let id = Uuid::new_v4();
        debug!(%id, %name, size, "staged attachment");
        self.staged.push(StagedAttachment {
            id,
            name,
            size,
            mime: mime_for(path),
            _handle: handle,
        });
        Ok(id)
    }

    /// Release a single staged file (the form's "remove attachment" path).
    pub fn remove(&mut self, id: Uuid) -> Result<(), AttachError> {
        let before = self.staged.len();
        self.staged.retain(|a| a.id != id);
        if self.staged.len() == before {
            return Err(AttachError::NotStaged(id));
        }
        Ok(())
    }

    /// Release everything still staged (the form-close path).
    pub fn discard(&mut self) {
        if !self.staged.is_empty() {
            debug!(count = self.staged.len(), "discarding staged attachments");
        }
        self.staged.clear();
    }

    /// Convert the staged set into persisted metadata records, releasing
    /// every handle.
    pub fn commit(&mut self) -> Vec<Attachment> {
        self.staged
            .drain(..)
            .map(|a| Attachment {
                id: a.id,
                name: a.name,
                size: a.size,
                mime: a.mime,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// Best-effort MIME guess from the file extension.
fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "json" => "application/json",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with_bytes(dir: &tempfile::TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(&vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn stage_records_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_with_bytes(&dir, "notes.txt", 42);
        let mut staged = StagedAttachments::new();
        staged.stage(&path).unwrap();
        let records = staged.commit();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "notes.txt");
        assert_eq!(records[0].size, 42);
        assert_eq!(records[0].mime, "text/plain");
        assert!(staged.is_empty());
    }

    #[test]
    fn oversized_file_is_rejected_others_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ok = file_with_bytes(&dir, "ok.png", 100);
        let big = file_with_bytes(&dir, "big.bin", 2048);
        let mut staged = StagedAttachments::new();
        staged.stage_with_limit(&ok, 1024).unwrap();
        let err = staged.stage_with_limit(&big, 1024).unwrap_err();
        assert!(matches!(err, AttachError::TooLarge { size: 2048, .. }));
        // The valid file stays staged despite the rejection.
        assert_eq!(staged.len(), 1);
    }

    #[test]
    fn remove_releases_a_single_handle() {
        let dir = tempfile::tempdir().unwrap();
        let a = file_with_bytes(&dir, "a.txt", 1);
        let b = file_with_bytes(&dir, "b.txt", 1);
        let mut staged = StagedAttachments::new();
        let id_a = staged.stage(&a).unwrap();
        staged.stage(&b).unwrap();
        staged.remove(id_a).unwrap();
        assert_eq!(staged.len(), 1);
        assert!(matches!(staged.remove(id_a), Err(AttachError::NotStaged(_))));
    }

    #[test]
    fn discard_releases_everything() {
        let dir = tempfile::tempdir().unwrap();
        let a = file_with_bytes(&dir, "a.txt", 1);
        let mut staged = StagedAttachments::new();
        staged.stage(&a).unwrap();
        staged.discard();
        assert!(staged.is_empty());
        assert!(staged.commit().is_empty());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedAttachments::new();
        let err = staged.stage(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, AttachError::Unreadable { .. }));
    }
}
