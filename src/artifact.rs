//! Delivering a downloaded artifact to the user.
//!
//! An [`ArtifactSink`] is the "save file" step. [`DirectorySink`] writes into
//! a directory with an atomic temp-file-then-rename, so an interrupted save
//! never leaves a truncated PDF behind, and strips any directory components
//! from the server-supplied name. [`MemorySink`] keeps the bytes in memory
//! for embedding callers and tests.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Receives the full payload of a downloaded artifact.
pub trait ArtifactSink: Send + Sync {
    /// Store `bytes` under `filename`. Returns where it went, if on disk.
    fn deliver(&self, filename: &str, bytes: &[u8]) -> io::Result<Option<PathBuf>>;
}

/// Saves artifacts into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path for a server-supplied filename, confined to `dir`.
    pub fn target_for(&self, filename: &str) -> io::Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("'{filename}' is not a usable file name"),
                )
            })?;
        Ok(self.dir.join(name))
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&self, filename: &str, bytes: &[u8]) -> io::Result<Option<PathBuf>> {
        let target = self.target_for(filename)?;
        std::fs::create_dir_all(&self.dir)?;

        // The temp file is deleted on drop unless persisted.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| e.error)?;

        info!("Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(Some(target))
    }
}

/// Keeps every delivered artifact in memory, latest last.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn delivered(&self) -> Vec<(String, Vec<u8>)> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&self, filename: &str, bytes: &[u8]) -> io::Result<Option<PathBuf>> {
        debug!("Holding {} ({} bytes) in memory", filename, bytes.len());
        self.delivered
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?
            .push((filename.to_string(), bytes.to_vec()));
        Ok(None)
    }
}

/// Where a downloaded artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub filename: String,
    /// `None` when the sink does not write to disk.
    pub path: Option<PathBuf>,
    pub size_bytes: u64,
}

impl SavedArtifact {
    pub(crate) fn new(filename: &str, path: Option<PathBuf>, size_bytes: usize) -> Self {
        Self {
            filename: filename.to_string(),
            path,
            size_bytes: size_bytes as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));

        let path = sink
            .deliver("modified_a.pdf", b"%PDF-1.7 data")
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("out/modified_a.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 data");
    }

    #[test]
    fn directory_sink_overwrites_on_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.deliver("a.pdf", b"one").unwrap();
        sink.deliver("a.pdf", b"two").unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.pdf")).unwrap(), b"two");
    }

    #[test]
    fn directory_sink_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        assert_eq!(
            sink.target_for("../../etc/modified_a.pdf").unwrap(),
            dir.path().join("modified_a.pdf")
        );
        assert!(sink.target_for("..").is_err());
        assert!(sink.target_for("").is_err());
    }

    #[test]
    fn directory_sink_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.deliver("a.pdf", b"x").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.pdf")]);
    }

    #[test]
    fn memory_sink_records_deliveries() {
        let sink = MemorySink::new();
        assert_eq!(sink.deliver("a.pdf", b"1").unwrap(), None);
        sink.deliver("a.pdf", b"1").unwrap();
        assert_eq!(sink.delivered().len(), 2);
        assert_eq!(sink.delivered()[1], ("a.pdf".to_string(), b"1".to_vec()));
    }
}
