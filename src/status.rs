//! The single status line shown to the user after every action.
//!
//! A [`Status`] carries its classification from the point where the outcome
//! is produced. Nothing downstream ever inspects the message text to decide
//! whether it was good or bad news; a token literally named "Success" cannot
//! turn an error banner green.

use crate::service::wire::ReplacementOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a front-end should present a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    /// Completed, but with nothing (or only part of it) changed.
    Neutral,
    Error,
}

/// A classified, human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn neutral(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Neutral,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    /// Summarise a manual find/replace result.
    ///
    /// With zero replacements every token is reported as missing (neutral).
    /// Otherwise the message lists tokens that were found with their counts,
    /// then the tokens that were not, each clause only when non-empty.
    pub fn for_replacements(
        total_replacements: u64,
        details: &BTreeMap<String, ReplacementOutcome>,
    ) -> Self {
        if total_replacements == 0 {
            let missing: Vec<&str> = details
                .iter()
                .filter(|(_, d)| !d.hit())
                .map(|(token, _)| token.as_str())
                .collect();

            return if missing.is_empty() {
                Status::neutral(
                    "No numbers were found and replaced. Please check if the numbers exist in the PDF.",
                )
            } else {
                Status::neutral(format!(
                    "Numbers not found in PDF: {}. Please check if these numbers exist in the document.",
                    missing.join(", ")
                ))
            };
        }

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for (token, detail) in details {
            if detail.hit() {
                found.push(format!("{token} ({} found)", detail.count));
            } else {
                missing.push(token.as_str());
            }
        }

        let mut message =
            format!("Successfully replaced {total_replacements} number(s) in the PDF.");
        if !found.is_empty() {
            message.push_str(&format!(" Found: {}.", found.join(", ")));
        }
        if !missing.is_empty() {
            message.push_str(&format!(" Not found: {}.", missing.join(", ")));
        }
        Status::success(message)
    }

    /// Summarise an automatic 21+ adjustment.
    ///
    /// The service's own message is surfaced verbatim. Its classification
    /// comes from the replacement count, not from the wording.
    pub fn for_adult_age(total_replacements: Option<u64>, message: Option<&str>) -> Self {
        let changed = total_replacements.unwrap_or(0) > 0;
        match message {
            Some(text) if !text.trim().is_empty() => {
                if changed {
                    Status::success(text)
                } else {
                    Status::neutral(text)
                }
            }
            _ if changed => Status::success(format!(
                "Made {} date change(s) to ensure all individuals are 21+",
                total_replacements.unwrap_or(0)
            )),
            _ => Status::neutral("No dates were found to modify. Original PDF returned."),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
