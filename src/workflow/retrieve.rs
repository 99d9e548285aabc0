//! Stage 4: fetch the processed artifact and hand it to a sink.
//!
//! Downloading leaves the session in `Processed` with the same artifact, so
//! it can be repeated. The payload is held only until the sink returns.

use super::{Pending, Settled, Workflow};
use crate::artifact::{ArtifactSink, SavedArtifact};
use crate::error::WorkflowError;
use crate::session::Event;
use crate::status::Status;
use std::sync::Arc;
use tracing::{info, warn};

impl Workflow {
    /// Start fetching the current artifact.
    pub fn begin_download(&mut self) -> Result<Pending<Vec<u8>>, WorkflowError> {
        let ticket = self.start(Event::StartDownload)?;
        let filename = self.artifact_filename()?;
        info!("Downloading {}", filename);

        let service = Arc::clone(&self.service);
        let call = Box::pin(async move { service.download(&filename).await });
        Ok(Pending::new(ticket, call))
    }

    /// Deliver the fetched bytes to `sink`.
    ///
    /// Any failure, remote or local, is reported as
    /// [`WorkflowError::DownloadFailure`]; the session stays `Processed`
    /// either way.
    pub fn settle_download(
        &mut self,
        settled: Settled<Vec<u8>>,
        sink: &dyn ArtifactSink,
    ) -> Result<SavedArtifact, WorkflowError> {
        self.check_current(settled.ticket)?;
        let ticket = settled.ticket;
        let filename = self.artifact_filename()?;

        let outcome = match settled.result {
            Ok(bytes) => sink
                .deliver(&filename, &bytes)
                .map(|path| SavedArtifact::new(&filename, path, bytes.len()))
                .map_err(|e| WorkflowError::DownloadFailure {
                    filename: filename.clone(),
                    reason: e.to_string(),
                }),
            Err(err @ WorkflowError::DownloadFailure { .. }) => Err(err),
            Err(other) => Err(WorkflowError::DownloadFailure {
                filename: filename.clone(),
                reason: other.to_string(),
            }),
        };

        self.apply(Event::DownloadSettled { ticket })?;
        match outcome {
            Ok(saved) => {
                self.set_status(Status::success(format!("Downloaded {filename}")));
                Ok(saved)
            }
            Err(err) => {
                warn!("Download failed: {:?}", err);
                self.report_error(&err);
                Err(err)
            }
        }
    }

    /// Fetch the artifact and deliver it to `sink`.
    pub async fn download(
        &mut self,
        sink: &dyn ArtifactSink,
    ) -> Result<SavedArtifact, WorkflowError> {
        let pending = self.begin_download()?;
        let settled = pending.resolve().await;
        self.settle_download(settled, sink)
    }

    fn artifact_filename(&self) -> Result<String, WorkflowError> {
        self.session
            .artifact()
            .map(|artifact| artifact.filename.clone())
            .ok_or_else(|| {
                WorkflowError::Internal(format!("no artifact in phase {}", self.phase()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::{Call, FakeService};
    use super::*;
    use crate::artifact::{DirectorySink, MemorySink};
    use crate::config::ClientConfig;
    use crate::document::{FileCandidate, PDF_MEDIA_TYPE};
    use crate::service::wire::{AdultAgeResponse, UploadResponse};
    use crate::session::{Operation, Phase};
    use std::io;
    use std::path::PathBuf;

    async fn processed() -> (Arc<FakeService>, Workflow) {
        let service = Arc::new(FakeService::default());
        let mut wf = Workflow::new(service.clone(), ClientConfig::default());
        service.push_upload(Ok(UploadResponse {
            encrypted: false,
            filename: Some("a.pdf".into()),
            message: None,
        }));
        service.push_adult_age(Ok(AdultAgeResponse {
            filename: "21plus_a.pdf".into(),
            total_replacements: Some(1),
            message: None,
            replacements_made: vec![("2006".into(), "2003".into())],
        }));
        wf.select(FileCandidate::new("a.pdf", PDF_MEDIA_TYPE, b"%PDF".to_vec()))
            .await
            .unwrap();
        wf.make_adult_age().await.unwrap();
        (service, wf)
    }

    struct BrokenSink;

    impl ArtifactSink for BrokenSink {
        fn deliver(&self, _filename: &str, _bytes: &[u8]) -> io::Result<Option<PathBuf>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[tokio::test]
    async fn download_delivers_and_keeps_artifact() {
        let (service, mut wf) = processed().await;
        service.push_download(Ok(b"%PDF-out".to_vec()));
        let artifact_before = wf.session().artifact().cloned();
        let sink = MemorySink::new();

        let saved = wf.download(&sink).await.unwrap();
        assert_eq!(saved.filename, "21plus_a.pdf");
        assert_eq!(saved.size_bytes, 8);
        assert_eq!(saved.path, None);
        assert_eq!(
            sink.delivered(),
            vec![("21plus_a.pdf".to_string(), b"%PDF-out".to_vec())]
        );
        assert_eq!(wf.phase(), Phase::Processed);
        assert_eq!(wf.session().artifact().cloned(), artifact_before);
        assert_eq!(wf.status().unwrap().message, "Downloaded 21plus_a.pdf");
    }

    #[tokio::test]
    async fn repeat_download_is_allowed() {
        let (service, mut wf) = processed().await;
        service.push_download(Ok(b"one".to_vec()));
        service.push_download(Ok(b"one".to_vec()));
        let sink = MemorySink::new();

        wf.download(&sink).await.unwrap();
        wf.download(&sink).await.unwrap();
        assert_eq!(sink.delivered().len(), 2);
        assert_eq!(
            service.calls().last(),
            Some(&Call::Download {
                filename: "21plus_a.pdf".into()
            })
        );
    }

    #[tokio::test]
    async fn download_writes_into_directory() {
        let (service, mut wf) = processed().await;
        service.push_download(Ok(b"%PDF".to_vec()));
        let dir = tempfile::tempdir().unwrap();

        let saved = wf.download(&DirectorySink::new(dir.path())).await.unwrap();
        let path = saved.path.unwrap();
        assert_eq!(path, dir.path().join("21plus_a.pdf"));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn remote_failure_keeps_processed() {
        let (service, mut wf) = processed().await;
        service.push_download(Err(WorkflowError::ConnectivityError {
            operation: Operation::Download,
            reason: "reset".into(),
        }));

        let err = wf.download(&MemorySink::new()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::DownloadFailure { .. }));
        assert_eq!(wf.phase(), Phase::Processed);
        assert!(wf.session().artifact().is_some());
        assert_eq!(wf.status().unwrap().message, "Failed to download file");
        assert!(wf.can(Operation::Download));
    }

    #[tokio::test]
    async fn sink_failure_is_a_download_failure() {
        let (service, mut wf) = processed().await;
        service.push_download(Ok(b"%PDF".to_vec()));

        let err = wf.download(&BrokenSink).await.unwrap_err();
        match err {
            WorkflowError::DownloadFailure { filename, reason } => {
                assert_eq!(filename, "21plus_a.pdf");
                assert!(reason.contains("read-only"), "got: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(wf.phase(), Phase::Processed);
    }

    #[tokio::test]
    async fn download_requires_artifact() {
        let service = Arc::new(FakeService::default());
        let mut wf = Workflow::new(service.clone(), ClientConfig::default());

        assert!(matches!(
            wf.begin_download(),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn resume_editing_then_process_again() {
        let (service, mut wf) = processed().await;
        wf.resume_editing().unwrap();
        assert_eq!(wf.phase(), Phase::Unlocked);
        assert!(wf.session().artifact().is_none());
        assert!(wf.begin_download().is_err());

        service.push_adult_age(Ok(AdultAgeResponse {
            filename: "21plus_a.pdf".into(),
            total_replacements: Some(0),
            message: None,
            replacements_made: vec![],
        }));
        wf.make_adult_age().await.unwrap();
        assert_eq!(wf.phase(), Phase::Processed);
    }

    #[tokio::test]
    async fn clear_during_download_discards_response() {
        let (service, mut wf) = processed().await;
        service.push_download(Ok(b"%PDF".to_vec()));
        let sink = MemorySink::new();

        let pending = wf.begin_download().unwrap();
        wf.clear();
        let settled = pending.resolve().await;

        assert!(matches!(
            wf.settle_download(settled, &sink),
            Err(WorkflowError::Superseded(Operation::Download))
        ));
        assert!(sink.delivered().is_empty());
        assert_eq!(wf.phase(), Phase::Empty);
    }
}
