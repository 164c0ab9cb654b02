use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Submitted, waiting for the service to issue an id.
    Loading,
    /// Id received, the file may be transferred.
    Ready,
    /// Removal requested, waiting to be evicted.
    Removing,
}

/// Read-only byte source behind a shared file.
///
/// The registry only reads `len`. The transport that streams a file to
/// peers once its record is `Ready` reads the content through `read_chunk`.
pub trait FileData: Send + Sync {
    fn len(&self) -> u64;
    /// Up to `size` bytes starting at `offset`; empty past the end.
    fn read_chunk(&self, offset: u64, size: u64) -> Vec<u8>;
}

impl FileData for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_chunk(&self, offset: u64, size: u64) -> Vec<u8> {
        let total = self.as_slice().len();
        let start = (offset as usize).min(total);
        let end = start.saturating_add(size as usize).min(total);
        self[start..end].to_vec()
    }
}

/// A file submitted by the local participant.
///
/// The name is the natural key: the service refers to files by name until it
/// issues ids.
#[derive(Clone)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
    pub data: Option<Arc<dyn FileData>>,
}

impl FileRef {
    /// Metadata only, without a content handle.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            data: None,
        }
    }

    pub fn with_data(name: impl Into<String>, data: Arc<dyn FileData>) -> Self {
        Self {
            name: name.into(),
            size: data.len(),
            data: Some(data),
        }
    }
}

impl std::fmt::Debug for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRef")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct TransferRecord {
    /// Local identity, stable for the record's whole lifetime.
    pub handle: Uuid,
    pub status: TransferStatus,
    pub file: FileRef,
    /// Server identifier. Present exactly when the record is not `Loading`.
    pub id: Option<String>,
    /// Instant of the last status transition.
    pub updated_at: Instant,
}

impl TransferRecord {
    pub(crate) fn new(file: FileRef, now: Instant) -> Self {
        Self {
            handle: Uuid::new_v4(),
            status: TransferStatus::Loading,
            file,
            id: None,
            updated_at: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub(crate) fn mark_ready(&mut self, id: String, now: Instant) {
        self.updated_at = now;
        self.status = TransferStatus::Ready;
        self.id = Some(id);
    }

    pub(crate) fn mark_removing(&mut self, now: Instant) {
        self.updated_at = now;
        self.status = TransferStatus::Removing;
    }
}
