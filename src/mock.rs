//! In-memory stand-ins for the server, the consent banner and the submission form
//!
//! These are used by tests, and can be used to try the submission flow without a server.

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use crate::{Event, EventId};
use crate::consent::ConsentDecision;
use crate::submission::{EventSubmission, SubmissionResponse};
use crate::traits::{ConsentPrompt, EventSource, SubmissionTransport, SubmissionView};
use crate::validation::Violation;


/// Scripted outcomes for the requests a [`MockServer`] receives
///
/// `(m, n)` lets `m` requests through, then drops the `n` following ones. A dropped request never gets an answer, like a lost connection.
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// Let everything through, see [`MockBehaviour::suspend`]
    pub is_suspended: bool,

    pub fetch_events_behaviour: (u32, u32),
    pub submit_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n_fails` dataset fetches and the next `n_fails` submissions are dropped
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            fetch_events_behaviour: (0, n_fails),
            submit_behaviour: (0, n_fails),
        }
    }

    /// Let every request through, without consuming the schedule, until [`MockBehaviour::resume`] is called
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_fetch_events(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.fetch_events_behaviour, "dataset fetch")
    }
    pub fn can_submit(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.submit_behaviour, "submission")
    }
}

/// Consume one step of a `(successes, failures)` schedule. Successes are used up first, then failures; an exhausted schedule always succeeds
fn decrement(schedule: &mut (u32, u32), action: &str) -> Result<(), Box<dyn Error>> {
    match schedule {
        (0, 0) => {
            log::trace!("Mock server: no scripted outcome left, the {} goes through", action);
            Ok(())
        },
        (0, failures) => {
            *failures -= 1;
            log::debug!("Mock server: dropping this {} ({} more failure(s) scripted)", action, failures);
            Err(format!("The mock server dropped this {} without answering", action).into())
        },
        (successes, _) => {
            *successes -= 1;
            log::debug!("Mock server: answering this {} ({} more success(es) before failing)", action, successes);
            Ok(())
        },
    }
}


/// An in-memory server.
///
/// Accepted events are not published right away: like the real site, they only appear in the canonical dataset once [`MockServer::publish`] "deploys" them.
#[derive(Default)]
pub struct MockServer {
    published: Mutex<Vec<Event>>,
    pending: Mutex<Vec<Event>>,
    requests: Mutex<Vec<EventSubmission>>,
    n_requests: AtomicUsize,

    behaviour: Mutex<MockBehaviour>,
    refusal: Mutex<Option<String>>,
    hold: Option<Arc<Notify>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behaviour(behaviour: MockBehaviour) -> Self {
        Self { behaviour: Mutex::new(behaviour), ..Self::default() }
    }

    /// Every submission request waits until `gate` is notified before being answered
    pub fn held_by(mut self, gate: Arc<Notify>) -> Self {
        self.hold = Some(gate);
        self
    }

    /// Answer every following submission with a logical failure
    pub fn refuse_with(&self, message: &str) {
        *lock(&self.refusal) = Some(message.to_string());
    }

    /// Accept submissions again
    pub fn accept(&self) {
        *lock(&self.refusal) = None;
    }

    /// Add an event to the canonical dataset
    pub fn add_published(&self, event: Event) {
        lock(&self.published).push(event);
    }

    /// Simulate the end of a deployment: accepted events become part of the canonical dataset
    pub fn publish(&self) {
        let mut pending = lock(&self.pending);
        let mut published = lock(&self.published);
        for event in pending.drain(..) {
            published.retain(|e| e.id() != event.id());
            published.push(event);
        }
    }

    /// How many submission requests have been received (including the ones that failed)
    pub fn request_count(&self) -> usize {
        self.n_requests.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<EventSubmission> {
        lock(&self.requests).clone()
    }

    /// An event, whether it has been published or not
    pub fn event(&self, id: &EventId) -> Option<Event> {
        lock(&self.pending).iter()
            .chain(lock(&self.published).iter())
            .find(|e| e.id() == id)
            .cloned()
    }

    fn record(&self, submission: &EventSubmission) {
        self.n_requests.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(submission.clone());
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.hold {
            gate.notified().await;
        }
    }

    /// What a logical failure would say, if any
    fn refusal(&self) -> Option<SubmissionResponse> {
        lock(&self.refusal).as_deref().map(SubmissionResponse::failed)
    }

    fn can_submit(&self) -> Result<(), String> {
        lock(&self.behaviour).can_submit().map_err(|err| err.to_string())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn event_from(id: EventId, submission: &EventSubmission) -> Result<Event, String> {
    let date: NaiveDate = submission.date.parse()
        .map_err(|_| format!("Ogiltigt datum: {}", submission.date))?;
    let optional = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
    Ok(Event::new(
            id, date,
            submission.start.clone(), submission.end.clone(),
            submission.title.clone(), submission.location.clone(), submission.responsible.clone(),
        )
        .with_description(optional(&submission.description))
        .with_link(optional(&submission.link)))
}

#[async_trait]
impl EventSource for MockServer {
    async fn fetch_events(&self) -> Result<Vec<serde_json::Value>, Box<dyn Error>> {
        lock(&self.behaviour).can_fetch_events()?;

        let published = lock(&self.published).clone();
        let mut records = Vec::new();
        for event in published {
            records.push(serde_json::to_value(event)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl SubmissionTransport for MockServer {
    async fn create_event(&self, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>> {
        self.record(submission);
        self.wait_for_gate().await;

        self.can_submit()?;
        if let Some(refusal) = self.refusal() {
            return Ok(refusal);
        }

        let id: EventId = uuid::Uuid::new_v4().to_hyphenated().to_string().parse()?;
        let event = match event_from(id.clone(), submission) {
            Ok(event) => event,
            Err(err) => return Ok(SubmissionResponse::failed(&err)),
        };
        lock(&self.pending).push(event);
        Ok(SubmissionResponse::succeeded(Some(&id)))
    }

    async fn edit_event(&self, id: &EventId, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>> {
        self.record(submission);
        self.wait_for_gate().await;

        self.can_submit()?;
        if let Some(refusal) = self.refusal() {
            return Ok(refusal);
        }

        if self.event(id).is_none() {
            return Ok(SubmissionResponse::failed("Evenemanget finns inte"));
        }
        let event = match event_from(id.clone(), submission) {
            Ok(event) => event,
            Err(err) => return Ok(SubmissionResponse::failed(&err)),
        };
        let mut pending = lock(&self.pending);
        pending.retain(|e| e.id() != id);
        pending.push(event);
        Ok(SubmissionResponse::succeeded(Some(id)))
    }
}


/// A consent banner that always gives the same answer, and counts how many times it has been shown
pub struct ScriptedPrompt {
    answer: ConsentDecision,
    n_asked: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn new(answer: ConsentDecision) -> Self {
        Self { answer, n_asked: AtomicUsize::new(0) }
    }

    pub fn times_asked(&self) -> usize {
        self.n_asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentPrompt for ScriptedPrompt {
    async fn ask(&self) -> ConsentDecision {
        self.n_asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}


/// Something that happened to a [`RecordingView`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    SubmitEnabled(bool),
    ValidationErrors(Vec<Violation>),
    Confirmation(Option<EventId>),
    Failure(String),
}

/// A submission form that records what it has been told to display
#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        lock(&self.events).clone()
    }

    /// Whether the submit button is currently enabled (it is, until told otherwise)
    pub fn submit_enabled(&self) -> bool {
        lock(&self.events).iter().rev()
            .find_map(|e| match e {
                ViewEvent::SubmitEnabled(enabled) => Some(*enabled),
                _ => None,
            })
            .unwrap_or(true)
    }

    fn push(&self, event: ViewEvent) {
        lock(&self.events).push(event);
    }
}

impl SubmissionView for RecordingView {
    fn set_submit_enabled(&self, enabled: bool) {
        self.push(ViewEvent::SubmitEnabled(enabled));
    }
    fn show_validation_errors(&self, errors: &[Violation]) {
        self.push(ViewEvent::ValidationErrors(errors.to_vec()));
    }
    fn show_confirmation(&self, id: Option<&EventId>) {
        self.push(ViewEvent::Confirmation(id.cloned()));
    }
    fn show_failure(&self, message: &str) {
        self.push(ViewEvent::Failure(message.to_string()));
    }
}
