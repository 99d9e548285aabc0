//! # pdfer
//!
//! Client-side controller for a remote PDF editing service: upload a PDF,
//! unlock it if it is password protected, rewrite numbers in it, and fetch
//! the result.
//!
//! ## Why this crate?
//!
//! The service does the PDF work; what is left on the client is a small but
//! easy-to-get-wrong state machine. Which controls are live, what happens
//! when a response arrives after the user already cleared the session, which
//! password and filename the next call must carry, and what the status line
//! says afterwards. This crate owns exactly that, behind one [`Workflow`]
//! type, so a CLI, a TUI or a GUI can all drive the same rules.
//!
//! ## Workflow Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload   validate the media type, send the file, detect encryption
//!  ├─ 2. Unlock   re-send with a password (encrypted files only)
//!  ├─ 3. Process  manual find/replace rules  ─┐
//!  │              or automatic 21+ date shift ─┘ mutually exclusive
//!  └─ 4. Download fetch the artifact into an ArtifactSink (repeatable)
//! ```
//!
//! Session phases:
//!
//! ```text
//! Empty → Selected → Uploading ─┬→ Locked ──(password)──┐
//!            ↑          │       └→ Unlocked ←───────────┘
//!            └─(failed)─┘            │  ↑
//!                                Processing  (resume editing)
//!                                    │  │
//!                                    └→ Processed ⟲ download
//! ```
//!
//! `clear` returns to `Empty` from anywhere; a response belonging to a
//! cleared or replaced session is discarded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfer::{ClientConfig, DirectorySink, FileCandidate, Phase, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!     let mut workflow = Workflow::connect(config)?;
//!
//!     let phase = workflow.select(FileCandidate::from_path("statement.pdf")?).await?;
//!     if phase == Phase::Locked {
//!         workflow.submit_password("hunter2").await?;
//!     }
//!     workflow.make_adult_age().await?;
//!     let saved = workflow.download(&DirectorySink::new(".")).await?;
//!
//!     if let Some(status) = workflow.status() {
//!         println!("{status}");
//!     }
//!     println!("saved {:?}", saved.path);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfer` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdfer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod config;
pub mod document;
pub mod error;
pub mod progress;
pub mod rules;
pub mod service;
pub mod session;
pub mod status;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{ArtifactSink, DirectorySink, MemorySink, SavedArtifact};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use document::{Document, FileCandidate, ProcessedArtifact};
pub use error::WorkflowError;
pub use progress::{NoopObserver, ProgressTicker, WorkflowObserver};
pub use rules::{ReplacementRule, RuleField, RuleSet};
pub use service::http::HttpService;
pub use service::ProcessingService;
pub use session::{Event, Operation, Phase, Session, Ticket};
pub use status::{Status, StatusKind};
pub use workflow::dispatch::ProcessingReply;
pub use workflow::{Pending, Settled, Workflow};
