//! Request and response shapes of the remote processing service.
//!
//! Responses are decoded leniently: optional fields default, unknown fields
//! are ignored, so a newer backend can add keys without breaking older
//! clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// `POST /upload` form fields.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
    pub password: Option<String>,
}

/// `POST /upload` success body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub encrypted: bool,
    /// Present once the service holds a readable copy of the file.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /process` form fields.
#[derive(Debug, Clone)]
pub struct ReplaceRequest {
    pub filename: String,
    pub password: Option<String>,
    pub replacements: BTreeMap<String, String>,
}

/// Per-token result of a manual replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementOutcome {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub count: u64,
}

impl ReplacementOutcome {
    /// Found at least once.
    pub fn hit(&self) -> bool {
        self.found && self.count > 0
    }
}

/// `POST /process` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceResponse {
    pub filename: String,
    #[serde(default)]
    pub total_replacements: u64,
    #[serde(default)]
    pub replacement_details: BTreeMap<String, ReplacementOutcome>,
    #[serde(default)]
    pub warning: Option<String>,
}

/// `POST /make-21-plus` form fields.
#[derive(Debug, Clone)]
pub struct AdultAgeRequest {
    pub filename: String,
    pub password: Option<String>,
}

/// `POST /make-21-plus` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdultAgeResponse {
    pub filename: String,
    #[serde(default)]
    pub total_replacements: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    /// `[from, to]` pairs the service decided on.
    #[serde(default)]
    pub replacements_made: Vec<(String, String)>,
}

/// Body of every non-success response that the service produced itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
