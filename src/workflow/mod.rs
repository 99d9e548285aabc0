//! The workflow controller.
//!
//! [`Workflow`] owns the [`Session`], the current [`Status`] line, the remote
//! [`ProcessingService`] and an observer. It is the only place session state
//! changes, always through [`Session::apply`].
//!
//! ## Three-step operations
//!
//! Every remote call is split so a UI event loop stays responsive and can
//! still `clear` the session while a request is out:
//!
//! ```text
//! begin_*  (sync)   validate, apply the start event, hand out a Pending<T>
//!   │
//! Pending::resolve  drive the request; owns everything it needs, borrows nothing
//!   │
//! settle_* (sync)   apply the completion event if its ticket is still current
//! ```
//!
//! The `async fn`s ([`Workflow::select`], [`Workflow::submit_password`],
//! [`Workflow::process`], [`Workflow::make_adult_age`], [`Workflow::download`])
//! chain the three steps for callers that do not need to interleave.
//!
//! Each stage lives in its own submodule:
//!
//! 1. [`upload`]: select a file and send it; detect encryption
//! 2. [`unlock`]: re-send with a password
//! 3. [`dispatch`]: manual find/replace or automatic 21+ adjustment
//! 4. [`retrieve`]: fetch the artifact and hand it to a sink

pub mod dispatch;
pub mod retrieve;
pub mod unlock;
pub mod upload;

use crate::config::ClientConfig;
use crate::error::WorkflowError;
use crate::progress::{NoopObserver, Observer, ProgressTicker};
use crate::rules::{RuleField, RuleSet};
use crate::service::http::HttpService;
use crate::service::ProcessingService;
use crate::session::{Event, Operation, Phase, Session, Ticket};
use crate::status::Status;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// An outstanding remote call.
///
/// Dropping it abandons the request and stops its progress ticker; the
/// session stays in its in-flight phase until cleared or reselected.
#[must_use = "a pending request does nothing unless resolved and settled"]
pub struct Pending<T> {
    ticket: Ticket,
    call: BoxFuture<'static, Result<T, WorkflowError>>,
    ticker: Option<ProgressTicker>,
}

impl<T> Pending<T> {
    fn new(ticket: Ticket, call: BoxFuture<'static, Result<T, WorkflowError>>) -> Self {
        Self {
            ticket,
            call,
            ticker: None,
        }
    }

    fn with_ticker(mut self, ticker: ProgressTicker) -> Self {
        self.ticker = Some(ticker);
        self
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Drive the request to completion. The progress ticker, if any, is
    /// stopped as soon as the response (or failure) arrives.
    pub async fn resolve(self) -> Settled<T> {
        let Pending {
            ticket,
            call,
            ticker,
        } = self;
        let result = call.await;
        if let Some(ticker) = ticker {
            ticker.finish();
        }
        Settled { ticket, result }
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("ticket", &self.ticket)
            .field("ticker", &self.ticker)
            .finish()
    }
}

/// A remote call that has come back, ready to be settled.
#[derive(Debug)]
pub struct Settled<T> {
    pub ticket: Ticket,
    pub result: Result<T, WorkflowError>,
}

/// Document-processing workflow controller.
pub struct Workflow {
    config: ClientConfig,
    service: Arc<dyn ProcessingService>,
    observer: Observer,
    session: Session,
    status: Option<Status>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("status", &self.status)
            .finish()
    }
}

impl Workflow {
    /// Controller backed by any service implementation.
    pub fn new(service: Arc<dyn ProcessingService>, config: ClientConfig) -> Self {
        Self {
            config,
            service,
            observer: Arc::new(NoopObserver),
            session: Session::new(),
            status: None,
        }
    }

    /// Controller talking HTTP to `config.base_url`.
    pub fn connect(config: ClientConfig) -> Result<Self, WorkflowError> {
        let service = HttpService::new(&config)?;
        Ok(Self::new(Arc::new(service), config))
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// The current status line, if any action has produced one.
    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Whether the control that starts `operation` should be enabled.
    pub fn can(&self, operation: Operation) -> bool {
        self.session.can(operation)
    }

    pub fn rules(&self) -> &RuleSet {
        self.session.rules()
    }

    // ── Rule editing ─────────────────────────────────────────────────────

    pub fn add_rule(&mut self) {
        if let Err(err) = self.apply(Event::AddRule) {
            debug!("Add rule ignored: {}", err);
        }
    }

    pub fn update_rule(
        &mut self,
        index: usize,
        field: RuleField,
        value: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        self.apply(Event::UpdateRule {
            index,
            field,
            value: value.into(),
        })
    }

    pub fn remove_rule(&mut self, index: usize) {
        if let Err(err) = self.apply(Event::RemoveRule { index }) {
            debug!("Remove rule {} ignored: {}", index, err);
        }
    }

    /// Replace the whole rule list, e.g. from CLI arguments or a rules file.
    pub fn set_rules(&mut self, rules: RuleSet) -> Result<(), WorkflowError> {
        let target = rules.len().max(1);
        while self.session.rules().len() < target {
            self.apply(Event::AddRule)?;
        }
        while self.session.rules().len() > target {
            let len = self.session.rules().len();
            self.apply(Event::RemoveRule { index: len - 1 })?;
            if self.session.rules().len() == len {
                break;
            }
        }
        for (index, rule) in rules.rules().iter().enumerate() {
            self.update_rule(index, RuleField::From, rule.from.clone())?;
            self.update_rule(index, RuleField::To, rule.to.clone())?;
        }
        Ok(())
    }

    // ── Session-wide actions ─────────────────────────────────────────────

    /// Discard the document, password, rules and artifact. Any response
    /// still in flight will be ignored when it settles.
    pub fn clear(&mut self) {
        if self.session.phase() == Phase::Empty {
            return;
        }
        if let Some(operation) = self.session.in_flight() {
            debug!("Clearing session with {} still in flight", operation);
        }
        if let Err(err) = self.apply(Event::Clear) {
            debug!("Clear ignored: {}", err);
            return;
        }
        self.status = None;
    }

    /// Drop the artifact and return to rule editing on the same document.
    pub fn resume_editing(&mut self) -> Result<(), WorkflowError> {
        self.apply(Event::ResumeEditing)?;
        self.status = None;
        Ok(())
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// Apply an event and notify the observer of any phase change.
    fn apply(&mut self, event: Event) -> Result<(), WorkflowError> {
        let before = self.session.phase();
        self.session = self.session.apply(event)?;
        let after = self.session.phase();
        if before != after {
            debug!("Phase {} → {}", before, after);
            self.observer.on_phase_change(before, after);
        }
        Ok(())
    }

    /// Start `operation`, returning its ticket.
    fn start(&mut self, event: Event) -> Result<Ticket, WorkflowError> {
        if let Err(err) = self.apply(event) {
            self.report_error(&err);
            return Err(err);
        }
        self.status = None;
        self.session
            .ticket()
            .ok_or_else(|| WorkflowError::Internal("operation started without a ticket".into()))
    }

    fn set_status(&mut self, status: Status) {
        self.observer.on_status(&status);
        self.status = Some(status);
    }

    /// Replace the status with the error's message, when it has one.
    fn report_error(&mut self, err: &WorkflowError) {
        if let Some(status) = err.status() {
            self.set_status(status);
        }
    }

    /// Reject a settled response whose session is gone, before anything else
    /// looks at it.
    fn check_current(&self, ticket: Ticket) -> Result<(), WorkflowError> {
        if ticket.generation != self.session.generation()
            || self.session.in_flight() != Some(ticket.operation)
        {
            debug!("Dropping stale {} response", ticket.operation);
            return Err(WorkflowError::Superseded(ticket.operation));
        }
        Ok(())
    }
}
