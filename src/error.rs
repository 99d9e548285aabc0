//! Error types for the pdfer library.
//!
//! Every failure the workflow can hit is a [`WorkflowError`]. The `Display`
//! text of the user-facing variants is exactly the message the session shows
//! in its status line, so a front-end never has to invent wording of its own.
//!
//! Variants fall into two groups:
//!
//! * **User-facing**: bad input, wrong password, server or network failures.
//!   [`WorkflowError::status`] turns them into an error [`Status`] that
//!   replaces whatever the session was showing before.
//!
//! * **Controller misuse**: an action that is not legal in the current
//!   phase, a duplicate submission, a late response for a session that has
//!   since been reset. These never touch the status line; they tell the
//!   caller (usually a UI layer) that a control should have been disabled.

use crate::session::{Operation, Phase};
use crate::status::Status;
use std::path::PathBuf;
use thiserror::Error;

/// Fixed text shown for every "no response" failure.
pub const CONNECTIVITY_MESSAGE: &str =
    "Failed to connect to the server. Please make sure the backend is running.";

/// All errors returned by the pdfer library.
#[derive(Debug, Error)]
pub enum WorkflowError {
    // ── Local validation ──────────────────────────────────────────────────
    /// The selected file does not declare the PDF media type.
    #[error("Please select a valid PDF file.")]
    InvalidFileType { name: String, media_type: String },

    /// A replacement rule has a blank "from" token.
    #[error("Please fill in all \"Number to Replace\" fields")]
    MissingReplacementTarget { index: usize },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// A rules file could not be read or is not a `{"from": "to"}` object.
    #[error("Invalid rules file '{path}': {detail}")]
    InvalidRulesFile { path: PathBuf, detail: String },

    // ── Remote failures ───────────────────────────────────────────────────
    /// The service accepted the file but did not unlock it.
    #[error("Invalid password. Please try again.")]
    InvalidPassword,

    /// Non-success response carrying a structured `detail`.
    #[error("{detail}")]
    ServerError { status: u16, detail: String },

    /// Response body could not be decoded.
    #[error("{}", operation.fallback_message())]
    MalformedServerResponse { operation: Operation, status: u16 },

    /// No response was received at all.
    #[error("{}", CONNECTIVITY_MESSAGE)]
    ConnectivityError { operation: Operation, reason: String },

    /// The processed artifact could not be fetched or saved.
    #[error("Failed to download file")]
    DownloadFailure { filename: String, reason: String },

    // ── Controller misuse ─────────────────────────────────────────────────
    /// The action is not available in the current phase.
    #[error("Cannot {action} while the session is {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },

    /// An operation is already outstanding.
    #[error("A {0} request is already in progress")]
    Busy(Operation),

    /// The response belongs to a session that has since been cleared or replaced.
    #[error("Ignoring {0} response for a session that is no longer current")]
    Superseded(Operation),

    /// Rule index does not exist.
    #[error("Replacement rule {index} does not exist ({len} rules)")]
    RuleIndexOutOfRange { index: usize, len: usize },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// The status line this error produces, or `None` for controller misuse
    /// errors that must leave the current status alone.
    pub fn status(&self) -> Option<Status> {
        match self {
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::Busy(_)
            | WorkflowError::Superseded(_)
            | WorkflowError::RuleIndexOutOfRange { .. }
            | WorkflowError::InvalidConfig(_) => None,
            other => Some(Status::error(other.to_string())),
        }
    }

    /// True when the failure happened before any request left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidFileType { .. }
                | WorkflowError::MissingReplacementTarget { .. }
                | WorkflowError::FileNotFound { .. }
                | WorkflowError::PermissionDenied { .. }
                | WorkflowError::InvalidRulesFile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusKind;

    #[test]
    fn server_error_shows_detail_verbatim() {
        let e = WorkflowError::ServerError {
            status: 500,
            detail: "Error processing PDF: boom".into(),
        };
        assert_eq!(e.to_string(), "Error processing PDF: boom");
    }

    #[test]
    fn malformed_response_uses_operation_fallback() {
        let e = WorkflowError::MalformedServerResponse {
            operation: Operation::Process,
            status: 502,
        };
        assert_eq!(
            e.to_string(),
            "Failed to process PDF. Server returned an error."
        );

        let e = WorkflowError::MalformedServerResponse {
            operation: Operation::AdultAge,
            status: 502,
        };
        assert!(e.to_string().contains("21+"), "got: {e}");
    }

    #[test]
    fn connectivity_hides_reason() {
        let e = WorkflowError::ConnectivityError {
            operation: Operation::Upload,
            reason: "tcp connect error: Connection refused".into(),
        };
        assert_eq!(e.to_string(), CONNECTIVITY_MESSAGE);
    }

    #[test]
    fn misuse_errors_have_no_status() {
        assert!(WorkflowError::Busy(Operation::Download).status().is_none());
        assert!(WorkflowError::Superseded(Operation::Upload)
            .status()
            .is_none());
    }

    #[test]
    fn user_errors_map_to_error_status() {
        let status = WorkflowError::InvalidPassword.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Invalid password. Please try again.");
    }

    #[test]
    fn local_errors_are_flagged() {
        assert!(WorkflowError::MissingReplacementTarget { index: 0 }.is_local());
        assert!(!WorkflowError::InvalidPassword.is_local());
    }
}
