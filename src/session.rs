//! The session record and its pure transition function.
//!
//! ## Phases
//!
//! ```text
//! Empty ──select──▶ Selected ──upload──▶ Uploading ─┬─▶ Locked ──unlock──▶ Unlocked
//!                      ▲                             │                       │  ▲
//!                      └──────── failure ────────────┘            process/21+│  │ failure / resume
//!                                                    └─▶ Unlocked ──────▶ Processing ──▶ Processed
//! ```
//!
//! `clear` returns to `Empty` from anywhere; selecting another file starts
//! over at `Selected`. Both bump [`Session::generation`].
//!
//! ## Tickets
//!
//! Starting a network operation records it in `in_flight` and hands out a
//! [`Ticket`]. The completion event must present that ticket. A ticket from
//! an older generation, or for an operation that is no longer outstanding,
//! is rejected with [`WorkflowError::Superseded`] so a late response can
//! never resurrect a session the user already threw away.

use crate::document::{Document, ProcessedArtifact};
use crate::error::WorkflowError;
use crate::rules::{RuleField, RuleSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Empty,
    Selected,
    Uploading,
    Locked,
    Unlocked,
    Processing,
    Processed,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Empty => "empty",
            Phase::Selected => "selected",
            Phase::Uploading => "uploading",
            Phase::Locked => "locked",
            Phase::Unlocked => "unlocked",
            Phase::Processing => "processing",
            Phase::Processed => "processed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote call the session can have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    Unlock,
    Process,
    AdultAge,
    Download,
}

impl Operation {
    /// The phase from which this operation may start.
    pub fn start_phase(self) -> Phase {
        match self {
            Operation::Upload => Phase::Selected,
            Operation::Unlock => Phase::Locked,
            Operation::Process | Operation::AdultAge => Phase::Unlocked,
            Operation::Download => Phase::Processed,
        }
    }

    /// Status text when the service answers with something unreadable.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Upload => "Failed to upload file. Server returned an error.",
            Operation::Unlock => "Failed to validate password. Server returned an error.",
            Operation::Process => "Failed to process PDF. Server returned an error.",
            Operation::AdultAge => {
                "Failed to process PDF for 21+ conversion. Server returned an error."
            }
            Operation::Download => "Failed to download file",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::Unlock => "unlock",
            Operation::Process => "process",
            Operation::AdultAge => "21+ adjustment",
            Operation::Download => "download",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof that a completion event belongs to the request that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub generation: u64,
    pub operation: Operation,
}

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum Event {
    Select(Document),
    Clear,
    StartUpload,
    Uploaded { ticket: Ticket, encrypted: bool },
    UploadFailed { ticket: Ticket },
    StartUnlock { password: String },
    Unlocked { ticket: Ticket, filename: String },
    UnlockRejected { ticket: Ticket },
    AddRule,
    UpdateRule { index: usize, field: RuleField, value: String },
    RemoveRule { index: usize },
    StartProcessing(Operation),
    ProcessingSucceeded { ticket: Ticket, artifact: ProcessedArtifact },
    ProcessingFailed { ticket: Ticket },
    StartDownload,
    DownloadSettled { ticket: Ticket },
    ResumeEditing,
}

/// The serialisable state of one document session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    generation: u64,
    phase: Phase,
    document: Option<Document>,
    rules: RuleSet,
    artifact: Option<ProcessedArtifact>,
    in_flight: Option<Operation>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn artifact(&self) -> Option<&ProcessedArtifact> {
        self.artifact.as_ref()
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    /// Ticket for the outstanding operation, if any.
    pub fn ticket(&self) -> Option<Ticket> {
        self.in_flight.map(|operation| Ticket {
            generation: self.generation,
            operation,
        })
    }

    /// Whether the control that starts `operation` should be enabled.
    pub fn can(&self, operation: Operation) -> bool {
        self.in_flight.is_none() && self.phase == operation.start_phase()
    }

    /// Compute the state after `event`. `self` is never modified.
    pub fn apply(&self, event: Event) -> Result<Session, WorkflowError> {
        let mut next = self.clone();

        match event {
            Event::Select(document) => {
                next = Session {
                    generation: self.generation + 1,
                    phase: Phase::Selected,
                    document: Some(document),
                    ..Session::default()
                };
            }
            Event::Clear => {
                if self.phase != Phase::Empty {
                    next = Session {
                        generation: self.generation + 1,
                        ..Session::default()
                    };
                }
            }
            Event::StartUpload => {
                next.begin(Operation::Upload, "upload")?;
                next.phase = Phase::Uploading;
            }
            Event::Uploaded { ticket, encrypted } => {
                next.settle(ticket)?;
                next.document_mut()?.encrypted = encrypted;
                next.phase = if encrypted {
                    Phase::Locked
                } else {
                    Phase::Unlocked
                };
            }
            Event::UploadFailed { ticket } => {
                next.settle(ticket)?;
                next.phase = Phase::Selected;
            }
            Event::StartUnlock { password } => {
                next.begin(Operation::Unlock, "submit a password")?;
                next.document_mut()?.password = Some(password);
            }
            Event::Unlocked { ticket, filename } => {
                next.settle(ticket)?;
                let document = next.document_mut()?;
                document.encrypted = false;
                document.display_name = filename;
                next.phase = Phase::Unlocked;
            }
            Event::UnlockRejected { ticket } => {
                next.settle(ticket)?;
            }
            Event::AddRule => next.rules.add(),
            Event::UpdateRule {
                index,
                field,
                value,
            } => next.rules.update(index, field, value)?,
            Event::RemoveRule { index } => next.rules.remove(index),
            Event::StartProcessing(operation) => {
                match operation {
                    Operation::Process => {
                        next.begin(operation, "process")?;
                        next.rules.validate()?;
                    }
                    Operation::AdultAge => next.begin(operation, "run the 21+ adjustment")?,
                    other => {
                        return Err(WorkflowError::Internal(format!(
                            "{other} is not a processing operation"
                        )))
                    }
                }
                next.phase = Phase::Processing;
            }
            Event::ProcessingSucceeded { ticket, artifact } => {
                next.settle(ticket)?;
                next.artifact = Some(artifact);
                next.phase = Phase::Processed;
            }
            Event::ProcessingFailed { ticket } => {
                next.settle(ticket)?;
                next.phase = Phase::Unlocked;
            }
            Event::StartDownload => {
                next.begin(Operation::Download, "download")?;
            }
            Event::DownloadSettled { ticket } => {
                next.settle(ticket)?;
            }
            Event::ResumeEditing => {
                next.ensure_idle()?;
                if next.phase != Phase::Processed {
                    return Err(WorkflowError::InvalidTransition {
                        action: "resume editing",
                        phase: next.phase,
                    });
                }
                next.artifact = None;
                next.phase = Phase::Unlocked;
            }
        }

        Ok(next)
    }

    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        match self.in_flight {
            Some(operation) => Err(WorkflowError::Busy(operation)),
            None => Ok(()),
        }
    }

    fn begin(&mut self, operation: Operation, action: &'static str) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        if self.phase != operation.start_phase() {
            return Err(WorkflowError::InvalidTransition {
                action,
                phase: self.phase,
            });
        }
        self.in_flight = Some(operation);
        Ok(())
    }

    fn settle(&mut self, ticket: Ticket) -> Result<(), WorkflowError> {
        if ticket.generation != self.generation || self.in_flight != Some(ticket.operation) {
            return Err(WorkflowError::Superseded(ticket.operation));
        }
        self.in_flight = None;
        Ok(())
    }

    fn document_mut(&mut self) -> Result<&mut Document, WorkflowError> {
        self.document
            .as_mut()
            .ok_or_else(|| WorkflowError::Internal(format!("no document in phase {}", self.phase)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FileCandidate, PDF_MEDIA_TYPE};

    fn pdf(name: &str) -> Document {
        Document::select(FileCandidate::new(name, PDF_MEDIA_TYPE, b"%PDF-1.7".to_vec())).unwrap()
    }

    fn step(session: &Session, event: Event) -> Session {
        session.apply(event).unwrap()
    }

    fn uploading(name: &str) -> (Session, Ticket) {
        let s = step(&Session::new(), Event::Select(pdf(name)));
        let s = step(&s, Event::StartUpload);
        let ticket = s.ticket().unwrap();
        (s, ticket)
    }

    fn unlocked() -> Session {
        let (s, ticket) = uploading("a.pdf");
        step(
            &s,
            Event::Uploaded {
                ticket,
                encrypted: false,
            },
        )
    }

    fn processed() -> Session {
        let s = step(&unlocked(), Event::StartProcessing(Operation::AdultAge));
        let ticket = s.ticket().unwrap();
        step(
            &s,
            Event::ProcessingSucceeded {
                ticket,
                artifact: ProcessedArtifact {
                    filename: "21plus_a.pdf".into(),
                    total_replacements: 1,
                    operation: Operation::AdultAge,
                },
            },
        )
    }

    #[test]
    fn starts_empty_with_one_rule() {
        let s = Session::new();
        assert_eq!(s.phase(), Phase::Empty);
        assert!(s.document().is_none());
        assert_eq!(s.rules().len(), 1);
    }

    #[test]
    fn apply_does_not_mutate_input() {
        let s = Session::new();
        let next = step(&s, Event::Select(pdf("a.pdf")));
        assert_eq!(s, Session::new());
        assert_eq!(next.phase(), Phase::Selected);
    }

    #[test]
    fn unencrypted_upload_unlocks() {
        let s = unlocked();
        assert_eq!(s.phase(), Phase::Unlocked);
        assert!(s.in_flight().is_none());
        assert!(!s.document().unwrap().encrypted);
    }

    #[test]
    fn encrypted_upload_locks_and_unlock_renames() {
        let (s, ticket) = uploading("secret.pdf");
        let s = step(
            &s,
            Event::Uploaded {
                ticket,
                encrypted: true,
            },
        );
        assert_eq!(s.phase(), Phase::Locked);
        assert!(s.document().unwrap().encrypted);

        let s = step(
            &s,
            Event::StartUnlock {
                password: "pw".into(),
            },
        );
        let ticket = s.ticket().unwrap();
        let s = step(
            &s,
            Event::Unlocked {
                ticket,
                filename: "secret_unlocked.pdf".into(),
            },
        );

        let doc = s.document().unwrap();
        assert_eq!(s.phase(), Phase::Unlocked);
        assert_eq!(doc.display_name, "secret_unlocked.pdf");
        assert_eq!(doc.original_name, "secret.pdf");
        assert_eq!(doc.password.as_deref(), Some("pw"));
        assert!(!doc.encrypted);
    }

    #[test]
    fn rejected_unlock_stays_locked_and_keeps_password() {
        let (s, ticket) = uploading("secret.pdf");
        let s = step(
            &s,
            Event::Uploaded {
                ticket,
                encrypted: true,
            },
        );
        for attempt in ["a", "b", "c"] {
            let started = step(
                &s,
                Event::StartUnlock {
                    password: attempt.into(),
                },
            );
            let ticket = started.ticket().unwrap();
            let rejected = step(&started, Event::UnlockRejected { ticket });
            assert_eq!(rejected.phase(), Phase::Locked);
            assert_eq!(rejected.document().unwrap().password.as_deref(), Some(attempt));
            assert!(rejected.can(Operation::Unlock));
        }
    }

    #[test]
    fn failed_upload_returns_to_selected_with_file() {
        let (s, ticket) = uploading("a.pdf");
        let s = step(&s, Event::UploadFailed { ticket });
        assert_eq!(s.phase(), Phase::Selected);
        assert_eq!(s.document().unwrap().display_name, "a.pdf");
        assert!(s.can(Operation::Upload));
    }

    #[test]
    fn duplicate_start_is_busy() {
        let (s, _) = uploading("a.pdf");
        assert!(matches!(
            s.apply(Event::StartUpload),
            Err(WorkflowError::Busy(Operation::Upload))
        ));

        let s = step(&unlocked(), Event::StartProcessing(Operation::AdultAge));
        assert!(!s.can(Operation::Process));
        assert!(matches!(
            s.apply(Event::StartProcessing(Operation::Process)),
            Err(WorkflowError::Busy(Operation::AdultAge))
        ));
    }

    #[test]
    fn processing_requires_unlocked() {
        let (s, ticket) = uploading("a.pdf");
        let locked = step(
            &s,
            Event::Uploaded {
                ticket,
                encrypted: true,
            },
        );
        assert!(matches!(
            locked.apply(Event::StartProcessing(Operation::AdultAge)),
            Err(WorkflowError::InvalidTransition {
                phase: Phase::Locked,
                ..
            })
        ));
    }

    #[test]
    fn blank_rule_blocks_manual_processing() {
        let s = unlocked();
        let err = s.apply(Event::StartProcessing(Operation::Process)).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingReplacementTarget { index: 0 }
        ));

        let s = step(
            &s,
            Event::UpdateRule {
                index: 0,
                field: RuleField::From,
                value: "2024".into(),
            },
        );
        let s = step(&s, Event::StartProcessing(Operation::Process));
        assert_eq!(s.phase(), Phase::Processing);
    }

    #[test]
    fn processing_failure_returns_to_unlocked() {
        let s = step(&unlocked(), Event::StartProcessing(Operation::AdultAge));
        let ticket = s.ticket().unwrap();
        let s = step(&s, Event::ProcessingFailed { ticket });
        assert_eq!(s.phase(), Phase::Unlocked);
        assert!(s.artifact().is_none());
    }

    #[test]
    fn download_keeps_artifact() {
        let s = processed();
        let artifact = s.artifact().cloned();
        let started = step(&s, Event::StartDownload);
        let ticket = started.ticket().unwrap();
        let done = step(&started, Event::DownloadSettled { ticket });
        assert_eq!(done.phase(), Phase::Processed);
        assert_eq!(done.artifact().cloned(), artifact);
        assert!(done.can(Operation::Download));
    }

    #[test]
    fn resume_editing_drops_artifact() {
        let s = step(&processed(), Event::ResumeEditing);
        assert_eq!(s.phase(), Phase::Unlocked);
        assert!(s.artifact().is_none());
        assert!(matches!(
            s.apply(Event::ResumeEditing),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn stale_ticket_after_clear_is_superseded() {
        let (s, ticket) = uploading("a.pdf");
        let cleared = step(&s, Event::Clear);
        assert_eq!(cleared.phase(), Phase::Empty);

        let err = cleared
            .apply(Event::Uploaded {
                ticket,
                encrypted: false,
            })
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Superseded(Operation::Upload)));
    }

    #[test]
    fn stale_ticket_after_reselect_is_superseded() {
        let (s, ticket) = uploading("a.pdf");
        let s = step(&s, Event::Select(pdf("b.pdf")));
        let s = step(&s, Event::StartUpload);

        assert!(matches!(
            s.apply(Event::UploadFailed { ticket }),
            Err(WorkflowError::Superseded(_))
        ));
        assert_eq!(s.phase(), Phase::Uploading);
        assert_eq!(s.document().unwrap().display_name, "b.pdf");
    }

    #[test]
    fn clear_discards_everything() {
        let s = step(
            &processed(),
            Event::UpdateRule {
                index: 0,
                field: RuleField::From,
                value: "07".into(),
            },
        );
        let cleared = step(&s, Event::Clear);
        assert_eq!(cleared.phase(), Phase::Empty);
        assert!(cleared.document().is_none());
        assert!(cleared.artifact().is_none());
        assert_eq!(cleared.rules(), &RuleSet::default());
        assert!(cleared.generation() > s.generation());
    }

    #[test]
    fn clear_on_empty_is_noop() {
        let s = Session::new();
        assert_eq!(step(&s, Event::Clear), s);
    }

    #[test]
    fn session_round_trips_through_json() {
        let s = processed();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"phase\":\"processed\""), "got: {json}");

        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.phase(), Phase::Processed);
        assert_eq!(back.artifact(), s.artifact());
    }

    #[test]
    fn restored_session_with_no_rules_gets_a_blank_row() {
        let json = serde_json::to_string(&unlocked()).unwrap();
        let blank_row = r#""rules":{"rules":[{"from":"","to":""}]}"#;
        assert!(json.contains(blank_row), "got: {json}");
        let json = json.replace(blank_row, r#""rules":{"rules":[]}"#);

        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rules(), &RuleSet::default());
        let s = step(&back, Event::RemoveRule { index: 0 });
        assert_eq!(s.rules().len(), 1);
    }
}
