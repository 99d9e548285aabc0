//! The contract with the remote processing service.
//!
//! The service does all of the PDF work: it detects encryption, unlocks
//! files, rewrites tokens and hands back the result. This crate only drives
//! it. [`ProcessingService`] is the seam: [`http::HttpService`] talks to a
//! real backend, tests plug in an in-memory fake.
//!
//! ## Error mapping
//!
//! Implementations must classify failures the same way so the controller can
//! build the right status line:
//!
//! | What happened | Error |
//! |---|---|
//! | no response at all | [`WorkflowError::ConnectivityError`] |
//! | non-success with a `{"detail": …}` body | [`WorkflowError::ServerError`] |
//! | any body that cannot be decoded | [`WorkflowError::MalformedServerResponse`] |
//! | artifact fetch failed for any reason | [`WorkflowError::DownloadFailure`] |

pub mod http;
pub mod wire;

use crate::error::WorkflowError;
use async_trait::async_trait;
use wire::{
    AdultAgeRequest, AdultAgeResponse, ReplaceRequest, ReplaceResponse, UploadRequest,
    UploadResponse,
};

/// One method per endpoint of the processing service.
#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// `POST /upload`, with or without a password.
    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, WorkflowError>;

    /// `POST /process`.
    async fn replace(&self, request: ReplaceRequest) -> Result<ReplaceResponse, WorkflowError>;

    /// `POST /make-21-plus`.
    async fn make_adult_age(
        &self,
        request: AdultAgeRequest,
    ) -> Result<AdultAgeResponse, WorkflowError>;

    /// `GET /download/{filename}`; the full artifact body.
    async fn download(&self, filename: &str) -> Result<Vec<u8>, WorkflowError>;
}
