//! Stage 1: accept a file and send it to the service.
//!
//! The service answers with whether the PDF is encrypted. An encrypted file
//! parks the session in `Locked` until [`super::unlock`] succeeds; anything
//! else is immediately ready for processing.

use super::{Pending, Settled, Workflow};
use crate::document::{Document, FileCandidate};
use crate::error::WorkflowError;
use crate::progress::ProgressTicker;
use crate::service::wire::{UploadRequest, UploadResponse};
use crate::session::{Event, Phase};
use crate::status::Status;
use std::sync::Arc;
use tracing::{info, warn};

/// Shown when the service reports an encrypted PDF.
pub const PASSWORD_REQUIRED_MESSAGE: &str =
    "This PDF is password protected. Enter the password to unlock it.";

impl Workflow {
    /// Accept `candidate` as the session's document and start uploading it.
    ///
    /// A non-PDF candidate is rejected with
    /// [`WorkflowError::InvalidFileType`]; the session is left exactly as it
    /// was. Selecting while another document is loaded replaces it.
    pub fn begin_select(
        &mut self,
        candidate: FileCandidate,
    ) -> Result<Pending<UploadResponse>, WorkflowError> {
        let document = match Document::select(candidate) {
            Ok(document) => document,
            Err(err) => {
                warn!("Rejected selection: {:?}", err);
                self.report_error(&err);
                return Err(err);
            }
        };
        info!(
            "Selected {} ({})",
            document.display_name,
            document.size_label()
        );

        self.apply(Event::Select(document))?;
        self.status = None;
        self.begin_upload()
    }

    /// Send the selected document. Also used to retry after a failed upload.
    pub fn begin_upload(&mut self) -> Result<Pending<UploadResponse>, WorkflowError> {
        let ticket = self.start(Event::StartUpload)?;
        let document = self.current_document()?;
        let request = UploadRequest {
            file_name: document.original_name.clone(),
            bytes: Arc::clone(document.bytes()),
            password: None,
        };

        let ticker = ProgressTicker::start(
            Arc::clone(&self.observer),
            self.config.progress_tick(),
            self.config.progress_step,
            self.config.progress_ceiling,
        );
        let service = Arc::clone(&self.service);
        let call = Box::pin(async move { service.upload(request).await });

        Ok(Pending::new(ticket, call).with_ticker(ticker))
    }

    /// Apply the upload response: `Locked`, `Unlocked`, or back to `Selected`.
    pub fn settle_upload(
        &mut self,
        settled: Settled<UploadResponse>,
    ) -> Result<Phase, WorkflowError> {
        self.check_current(settled.ticket)?;
        let ticket = settled.ticket;

        match settled.result {
            Ok(response) => {
                self.apply(Event::Uploaded {
                    ticket,
                    encrypted: response.encrypted,
                })?;
                if response.encrypted {
                    info!("Upload complete; document is encrypted");
                    self.set_status(Status::neutral(PASSWORD_REQUIRED_MESSAGE));
                } else {
                    info!("Upload complete; document is ready");
                }
                Ok(self.phase())
            }
            Err(err) => {
                warn!("Upload failed: {:?}", err);
                self.apply(Event::UploadFailed { ticket })?;
                self.report_error(&err);
                Err(err)
            }
        }
    }

    /// Select a file and upload it in one go.
    pub async fn select(&mut self, candidate: FileCandidate) -> Result<Phase, WorkflowError> {
        let pending = self.begin_select(candidate)?;
        let settled = pending.resolve().await;
        self.settle_upload(settled)
    }

    /// Re-send the retained file after a failed upload.
    pub async fn retry_upload(&mut self) -> Result<Phase, WorkflowError> {
        let pending = self.begin_upload()?;
        let settled = pending.resolve().await;
        self.settle_upload(settled)
    }

    pub(crate) fn current_document(&self) -> Result<&Document, WorkflowError> {
        self.session.document().ok_or_else(|| {
            WorkflowError::Internal(format!("no document in phase {}", self.phase()))
        })
    }
}
