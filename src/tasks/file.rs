//! # File handles delivered by the selection surface.
//!
//! A [`FileHandle`] is what the surface hands to
//! [`Orchestrator::accept`](crate::Orchestrator::accept): a declared name, a byte
//! size, a declared media type (possibly empty, browsers often leave it blank) and
//! a reference to the payload itself.
//!
//! Handles are cheap to clone: names are `Arc<str>` and in-memory payloads are
//! [`Bytes`].
//!
//! ## Example
//! ```rust
//! use intakevisor::FileHandle;
//!
//! let f = FileHandle::from_bytes("report.PDF", "application/pdf", vec![0u8; 2048]);
//! assert_eq!(f.size(), 2048);
//! assert_eq!(f.extension().as_deref(), Some("pdf"));
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

/// Where the bytes of a file live.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Payload already read into memory.
    Bytes(Bytes),
    /// Payload on disk; the transport streams it.
    Path(PathBuf),
}

/// Immutable reference to one selected file.
#[derive(Clone)]
pub struct FileHandle {
    name: Arc<str>,
    media_type: Arc<str>,
    size: u64,
    payload: Payload,
}

impl FileHandle {
    /// Creates a handle over an in-memory payload. The size is the payload length.
    pub fn from_bytes(
        name: impl Into<Arc<str>>,
        media_type: impl Into<Arc<str>>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: bytes.len() as u64,
            payload: Payload::Bytes(bytes),
        }
    }

    /// Creates a handle over a file on disk with a declared size.
    pub fn from_path(
        name: impl Into<Arc<str>>,
        media_type: impl Into<Arc<str>>,
        size: u64,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size,
            payload: Payload::Path(path.into()),
        }
    }

    /// Declared file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared name, for ids and events.
    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Declared media type; empty when the surface did not provide one.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Payload reference.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// In-memory bytes, if the payload is held in memory.
    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Bytes(b) => Some(b),
            Payload::Path(_) => None,
        }
    }

    /// On-disk path, if the payload lives on disk.
    pub fn path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Bytes(_) => None,
            Payload::Path(p) => Some(p),
        }
    }

    /// Lowercased extension of the file name, without the dot.
    ///
    /// `None` for names without a dot, or ending in one. A leading dot alone
    /// (`.env`) counts as an extension, the way browsers match `accept=".env"`.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.size)
            .field(
                "payload",
                &match &self.payload {
                    Payload::Bytes(_) => "bytes",
                    Payload::Path(_) => "path",
                },
            )
            .finish()
    }
}
