//! The file a session works on, and the artifact a processing call leaves behind.
//!
//! ## Declared media type
//!
//! Selection is gated on the media type the file *declares*, the way a file
//! picker reports it, not on a deep parse: the PDF itself is only ever opened
//! by the remote service. [`FileCandidate::from_path`] declares
//! `application/pdf` when the extension says so or when the first bytes are
//! the `%PDF` magic, so a renamed download still gets through.

use crate::error::WorkflowError;
use crate::session::Operation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// A file the user picked but that has not been accepted yet.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a local file and declare its media type.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => WorkflowError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => WorkflowError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let media_type = declared_media_type(path, &bytes);
        debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), media_type);

        Ok(Self::new(name, media_type, bytes))
    }

    fn is_pdf(&self) -> bool {
        let essence = self
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        essence.eq_ignore_ascii_case(PDF_MEDIA_TYPE)
    }
}

fn declared_media_type(path: &Path, bytes: &[u8]) -> &'static str {
    let by_extension = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if by_extension || bytes.starts_with(b"%PDF") {
        PDF_MEDIA_TYPE
    } else {
        FALLBACK_MEDIA_TYPE
    }
}

/// The live document of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Raw file contents; shared, never serialised.
    #[serde(skip)]
    bytes: Arc<Vec<u8>>,
    /// Name used for every call after upload; the service may rename the
    /// file when it unlocks it.
    pub display_name: String,
    /// Name the file had when it was picked; the upload part carries it.
    pub original_name: String,
    pub size_bytes: u64,
    pub media_type: String,
    pub encrypted: bool,
    /// Carried forward to later calls once the user has supplied it.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Document {
    /// Accept a candidate, or reject it without side effects.
    pub fn select(candidate: FileCandidate) -> Result<Self, WorkflowError> {
        if !candidate.is_pdf() {
            return Err(WorkflowError::InvalidFileType {
                name: candidate.name,
                media_type: candidate.media_type,
            });
        }

        Ok(Self {
            size_bytes: candidate.bytes.len() as u64,
            bytes: Arc::new(candidate.bytes),
            display_name: candidate.name.clone(),
            original_name: candidate.name,
            media_type: PDF_MEDIA_TYPE.to_string(),
            encrypted: false,
            password: None,
        })
    }

    pub fn bytes(&self) -> &Arc<Vec<u8>> {
        &self.bytes
    }

    /// Size in mebibytes, two decimals, as a file card shows it.
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}

/// The server-held result of a processing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedArtifact {
    pub filename: String,
    pub total_replacements: u64,
    pub operation: Operation,
}
