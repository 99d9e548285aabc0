//! [`ProcessingService`] over HTTP with `reqwest`.
//!
//! Every POST is `multipart/form-data`; every answer is JSON except the
//! artifact download, which is the raw PDF body.

use super::wire::{
    AdultAgeRequest, AdultAgeResponse, ErrorBody, ReplaceRequest, ReplaceResponse, UploadRequest,
    UploadResponse,
};
use super::ProcessingService;
use crate::config::ClientConfig;
use crate::document::PDF_MEDIA_TYPE;
use crate::error::WorkflowError;
use crate::session::Operation;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// HTTP client for the processing service.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    base: Url,
}

impl HttpService {
    pub fn new(config: &ClientConfig) -> Result<Self, WorkflowError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| WorkflowError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base: config.base()?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, WorkflowError> {
        self.base
            .join(path)
            .map_err(|e| WorkflowError::Internal(format!("endpoint '{path}': {e}")))
    }

    /// `/download/{filename}` with the filename as one escaped path segment.
    fn download_url(&self, filename: &str) -> Result<Url, WorkflowError> {
        let mut url = self.endpoint("download/")?;
        url.path_segments_mut()
            .map_err(|_| WorkflowError::Internal("base URL cannot be a base".into()))?
            .pop_if_empty()
            .push(filename);
        Ok(url)
    }

    async fn post(
        &self,
        operation: Operation,
        path: &str,
        form: Form,
    ) -> Result<Response, WorkflowError> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        self.client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("{} request failed: {}", operation, e);
                WorkflowError::ConnectivityError {
                    operation,
                    reason: e.to_string(),
                }
            })
    }
}

/// Decode a JSON success body or classify the failure.
async fn decode<T: DeserializeOwned>(
    operation: Operation,
    response: Response,
) -> Result<T, WorkflowError> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
        warn!("{} response body could not be read: {}", operation, e);
        WorkflowError::ConnectivityError {
            operation,
            reason: e.to_string(),
        }
    })?;

    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|e| {
            warn!("{} returned an undecodable body: {}", operation, e);
            WorkflowError::MalformedServerResponse {
                operation,
                status: status.as_u16(),
            }
        });
    }

    Err(classify_failure(operation, status.as_u16(), &body))
}

/// Map a non-success response to an error. Only a non-blank `detail` is
/// shown verbatim; anything else falls back to the operation's message.
fn classify_failure(operation: Operation, status: u16, body: &[u8]) -> WorkflowError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody { detail }) if !detail.trim().is_empty() => {
            info!("{} rejected with HTTP {}: {}", operation, status, detail);
            WorkflowError::ServerError { status, detail }
        }
        _ => {
            warn!("{} failed with HTTP {} and no error detail", operation, status);
            WorkflowError::MalformedServerResponse { operation, status }
        }
    }
}

fn with_password(form: Form, password: Option<String>) -> Form {
    match password {
        Some(p) if !p.is_empty() => form.text("password", p),
        _ => form,
    }
}

#[async_trait]
impl ProcessingService for HttpService {
    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, WorkflowError> {
        let operation = if request.password.is_some() {
            Operation::Unlock
        } else {
            Operation::Upload
        };
        let part = Part::bytes(request.bytes.as_ref().clone())
            .file_name(request.file_name)
            .mime_str(PDF_MEDIA_TYPE)
            .map_err(|e| WorkflowError::Internal(format!("multipart: {e}")))?;
        let form = with_password(Form::new().part("file", part), request.password);

        let response = self.post(operation, "upload", form).await?;
        decode(operation, response).await
    }

    async fn replace(&self, request: ReplaceRequest) -> Result<ReplaceResponse, WorkflowError> {
        let replacements = serde_json::to_string(&request.replacements)
            .map_err(|e| WorkflowError::Internal(format!("replacements: {e}")))?;
        let form = with_password(Form::new().text("filename", request.filename), request.password)
            .text("replacements", replacements);

        let response = self.post(Operation::Process, "process", form).await?;
        decode(Operation::Process, response).await
    }

    async fn make_adult_age(
        &self,
        request: AdultAgeRequest,
    ) -> Result<AdultAgeResponse, WorkflowError> {
        let form = with_password(Form::new().text("filename", request.filename), request.password);

        let response = self.post(Operation::AdultAge, "make-21-plus", form).await?;
        decode(Operation::AdultAge, response).await
    }

    async fn download(&self, filename: &str) -> Result<Vec<u8>, WorkflowError> {
        let failure = |reason: String| WorkflowError::DownloadFailure {
            filename: filename.to_string(),
            reason,
        };

        let url = self.download_url(filename)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| failure(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpService {
        let config = ClientConfig::builder().base_url(base).build().unwrap();
        HttpService::new(&config).unwrap()
    }

    #[test]
    fn failure_detail_is_kept_verbatim() {
        let body = br#"{"detail":"Only PDF files are allowed"}"#;
        let err = classify_failure(Operation::Upload, 400, body);
        assert!(matches!(
            err,
            WorkflowError::ServerError { status: 400, ref detail } if detail == "Only PDF files are allowed"
        ));
    }

    #[test]
    fn blank_failure_detail_falls_back() {
        let bodies: [&[u8]; 3] = [
            br#"{"detail":""}"#,
            br#"{"detail":"   "}"#,
            b"Internal Server Error",
        ];
        for body in bodies {
            let err = classify_failure(Operation::Process, 500, body);
            assert!(
                matches!(
                    err,
                    WorkflowError::MalformedServerResponse {
                        operation: Operation::Process,
                        status: 500
                    }
                ),
                "body {:?} gave {err:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let s = service("http://localhost:8000/api");
        assert_eq!(
            s.endpoint("make-21-plus").unwrap().as_str(),
            "http://localhost:8000/api/make-21-plus"
        );
    }

    #[test]
    fn download_url_escapes_filename() {
        let s = service("http://localhost:8000");
        assert_eq!(
            s.download_url("modified_my file#1.pdf").unwrap().as_str(),
            "http://localhost:8000/download/modified_my%20file%231.pdf"
        );
    }

    #[test]
    fn download_url_keeps_slashes_inside_segment() {
        let s = service("http://localhost:8000");
        let url = s.download_url("../etc/passwd").unwrap();
        assert_eq!(url.path(), "/download/..%2Fetc%2Fpasswd");
    }
}
