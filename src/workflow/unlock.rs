//! Stage 2: unlock an encrypted document with a password.
//!
//! The file is re-sent with the password. The service answers with the name
//! it stored the readable copy under, and every later call uses that name.
//! No name, or a 401, means the password was wrong.

use super::{Pending, Settled, Workflow};
use crate::error::WorkflowError;
use crate::service::wire::{UploadRequest, UploadResponse};
use crate::session::{Event, Phase};
use std::sync::Arc;
use tracing::{info, warn};

impl Workflow {
    /// Start re-uploading the locked document with `password`.
    pub fn begin_unlock(
        &mut self,
        password: impl Into<String>,
    ) -> Result<Pending<UploadResponse>, WorkflowError> {
        let password = password.into();
        let ticket = self.start(Event::StartUnlock {
            password: password.clone(),
        })?;
        let document = self.current_document()?;
        let request = UploadRequest {
            file_name: document.original_name.clone(),
            bytes: Arc::clone(document.bytes()),
            password: Some(password),
        };

        let service = Arc::clone(&self.service);
        let call = Box::pin(async move { service.upload(request).await });
        Ok(Pending::new(ticket, call))
    }

    /// Apply the unlock response: `Unlocked` with the new name, or stay
    /// `Locked` with an error status.
    pub fn settle_unlock(
        &mut self,
        settled: Settled<UploadResponse>,
    ) -> Result<Phase, WorkflowError> {
        self.check_current(settled.ticket)?;
        let ticket = settled.ticket;

        let outcome = match settled.result {
            Ok(UploadResponse {
                filename: Some(filename),
                ..
            }) if !filename.is_empty() => Ok(filename),
            Ok(_) => Err(WorkflowError::InvalidPassword),
            Err(
                WorkflowError::ServerError { status: 401, .. }
                | WorkflowError::MalformedServerResponse { status: 401, .. },
            ) => Err(WorkflowError::InvalidPassword),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(filename) => {
                info!("Unlocked; service holds the file as {}", filename);
                self.apply(Event::Unlocked { ticket, filename })?;
                Ok(self.phase())
            }
            Err(err) => {
                warn!("Unlock failed: {:?}", err);
                self.apply(Event::UnlockRejected { ticket })?;
                self.report_error(&err);
                Err(err)
            }
        }
    }

    /// Submit a password and wait for the verdict.
    pub async fn submit_password(
        &mut self,
        password: impl Into<String>,
    ) -> Result<Phase, WorkflowError> {
        let pending = self.begin_unlock(password)?;
        let settled = pending.resolve().await;
        self.settle_unlock(settled)
    }
}
