//! Stage 3: process the unlocked document.
//!
//! Two mutually exclusive operations, both from `Unlocked`:
//!
//! - **manual** find/replace with the session's rule list, validated locally
//!   before any request is made;
//! - **automatic 21+ adjustment**, decided entirely by the service.
//!
//! Either leaves a [`ProcessedArtifact`] on the server and a summary status.

use super::{Pending, Settled, Workflow};
use crate::document::ProcessedArtifact;
use crate::error::WorkflowError;
use crate::service::wire::{AdultAgeRequest, AdultAgeResponse, ReplaceRequest, ReplaceResponse};
use crate::session::{Event, Operation};
use crate::status::Status;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a processing call came back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingReply {
    Replace(ReplaceResponse),
    AdultAge(AdultAgeResponse),
}

impl ProcessingReply {
    fn into_outcome(self) -> (ProcessedArtifact, Status) {
        match self {
            ProcessingReply::Replace(response) => {
                if let Some(warning) = &response.warning {
                    warn!("Service warning: {}", warning);
                }
                for (token, detail) in &response.replacement_details {
                    debug!("{}: found={} count={}", token, detail.found, detail.count);
                }
                let status =
                    Status::for_replacements(response.total_replacements, &response.replacement_details);
                let artifact = ProcessedArtifact {
                    filename: response.filename,
                    total_replacements: response.total_replacements,
                    operation: Operation::Process,
                };
                (artifact, status)
            }
            ProcessingReply::AdultAge(response) => {
                for (from, to) in &response.replacements_made {
                    debug!("Date change {} → {}", from, to);
                }
                let status = Status::for_adult_age(
                    response.total_replacements,
                    response.message.as_deref(),
                );
                let artifact = ProcessedArtifact {
                    filename: response.filename,
                    total_replacements: response.total_replacements.unwrap_or(0),
                    operation: Operation::AdultAge,
                };
                (artifact, status)
            }
        }
    }
}

impl Workflow {
    /// Start a manual find/replace.
    ///
    /// A rule with a blank "from" fails here with
    /// [`WorkflowError::MissingReplacementTarget`] and nothing is sent.
    pub fn begin_process(&mut self) -> Result<Pending<ProcessingReply>, WorkflowError> {
        let ticket = self.start(Event::StartProcessing(Operation::Process))?;
        let document = self.current_document()?;
        let request = ReplaceRequest {
            filename: document.display_name.clone(),
            password: document.password.clone(),
            replacements: self.session.rules().to_mapping(),
        };
        info!(
            "Replacing {} token(s) in {}",
            request.replacements.len(),
            request.filename
        );

        let service = Arc::clone(&self.service);
        let call = Box::pin(async move {
            service
                .replace(request)
                .await
                .map(ProcessingReply::Replace)
        });
        Ok(Pending::new(ticket, call))
    }

    /// Start the automatic 21+ date adjustment.
    pub fn begin_make_adult_age(&mut self) -> Result<Pending<ProcessingReply>, WorkflowError> {
        let ticket = self.start(Event::StartProcessing(Operation::AdultAge))?;
        let document = self.current_document()?;
        let request = AdultAgeRequest {
            filename: document.display_name.clone(),
            password: document.password.clone(),
        };
        info!("Requesting 21+ adjustment of {}", request.filename);

        let service = Arc::clone(&self.service);
        let call = Box::pin(async move {
            service
                .make_adult_age(request)
                .await
                .map(ProcessingReply::AdultAge)
        });
        Ok(Pending::new(ticket, call))
    }

    /// Apply a processing response: `Processed` with an artifact and summary,
    /// or back to `Unlocked` with an error status.
    pub fn settle_processing(
        &mut self,
        settled: Settled<ProcessingReply>,
    ) -> Result<ProcessedArtifact, WorkflowError> {
        self.check_current(settled.ticket)?;
        let ticket = settled.ticket;

        match settled.result {
            Ok(reply) => {
                let (artifact, status) = reply.into_outcome();
                info!(
                    "{} produced {} ({} replacement(s))",
                    ticket.operation, artifact.filename, artifact.total_replacements
                );
                self.apply(Event::ProcessingSucceeded {
                    ticket,
                    artifact: artifact.clone(),
                })?;
                self.set_status(status);
                Ok(artifact)
            }
            Err(err) => {
                warn!("{} failed: {:?}", ticket.operation, err);
                self.apply(Event::ProcessingFailed { ticket })?;
                self.report_error(&err);
                Err(err)
            }
        }
    }

    /// Run a manual find/replace with the current rules.
    pub async fn process(&mut self) -> Result<ProcessedArtifact, WorkflowError> {
        let pending = self.begin_process()?;
        let settled = pending.resolve().await;
        self.settle_processing(settled)
    }

    /// Run the automatic 21+ adjustment.
    pub async fn make_adult_age(&mut self) -> Result<ProcessedArtifact, WorkflowError> {
        let pending = self.begin_make_adult_age()?;
        let settled = pending.resolve().await;
        self.settle_processing(settled)
    }
}
