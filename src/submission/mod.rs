//! Submitting a new event, or changes to an existing one
//!
//! An [`Orchestrator`] drives one submission form: it validates the form, makes sure the visitor has been asked about cookies,
//! sends exactly one request at a time and tells the form what to display.

use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::EventId;
use crate::consent::ConsentRecord;
use crate::traits::{Clock, ConsentPrompt, CookieJar, SubmissionTransport, SubmissionView};
use crate::validation::{FormFields, Violation, validate};

pub mod progress;
use progress::{FeedbackSender, ProgressSchedule, SubmissionEvent, feedback};

/// Displayed when the server could not be reached, or gave an answer that makes no sense
pub const CONNECTION_FAILURE_MESSAGE: &str = "Kunde inte nå servern. Kontrollera din internetanslutning och försök igen.";

/// Displayed when the server reported a failure without saying why
pub const UNEXPLAINED_FAILURE_MESSAGE: &str = "Evenemanget kunde inte sparas. Försök igen senare.";


/// The body of a submission request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmission {
    /// Only set when editing an existing event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    pub title: String,
    pub date: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub responsible: String,
    pub description: String,
    pub link: String,
    /// The name the server uses to label the change request
    pub owner_name: String,
}

impl EventSubmission {
    pub fn from_form(form: &FormFields, owner_name: &str, id: Option<EventId>) -> Self {
        Self {
            id,
            title: form.title.trim().to_string(),
            date: form.date.trim().to_string(),
            start: form.start.trim().to_string(),
            end: form.end.trim().to_string(),
            location: form.location.trim().to_string(),
            responsible: form.responsible.trim().to_string(),
            // Leading whitespace is meaningful in Markdown
            description: match form.description.trim().is_empty() {
                true => String::new(),
                false => form.description.clone(),
            },
            link: form.link.trim().to_string(),
            owner_name: owner_name.trim().to_string(),
        }
    }
}

/// The answer of the server to a submission request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    /// Why the submission failed. This is already localized and safe to display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The ID the server assigned to a newly created event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubmissionResponse {
    pub fn succeeded(id: Option<&EventId>) -> Self {
        Self { success: true, error: None, id: id.map(|id| id.to_string()) }
    }

    pub fn failed(error: &str) -> Self {
        Self { success: false, error: Some(error.to_string()), id: None }
    }
}


/// Why a submission failed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The server understood the request, but could not perform it
    Server(String),
    /// No interpretable answer was received
    Transport,
}

impl FailureReason {
    /// What to display to the visitor
    pub fn message(&self) -> &str {
        match self {
            FailureReason::Server(message) => message,
            FailureReason::Transport => CONNECTION_FAILURE_MESSAGE,
        }
    }
}

/// Where a form stands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    /// Waiting for the visitor to answer the cookie prompt
    ConsentPending,
    /// A request has been sent, its answer is awaited
    InFlight,
    Succeeded{ id: Option<EventId> },
    Failed(FailureReason),
}

impl SubmissionState {
    /// Whether the submit action is available
    pub fn submit_enabled(&self) -> bool {
        matches!(self, SubmissionState::Idle | SubmissionState::Failed(_))
    }
}

impl Display for SubmissionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionState::Idle => write!(f, "idle"),
            SubmissionState::ConsentPending => write!(f, "consent-pending"),
            SubmissionState::InFlight => write!(f, "in-flight"),
            SubmissionState::Succeeded{..} => write!(f, "succeeded"),
            SubmissionState::Failed(reason) => write!(f, "failed ({})", reason.message()),
        }
    }
}

/// What a call to [`Orchestrator::submit`] did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The form has errors, nothing has been sent
    Invalid(Vec<Violation>),
    /// The submit action was not available (a request is already in flight, or the form has already been submitted)
    Rejected,
    Succeeded(Option<EventId>),
    Failed(FailureReason),
}


/// What the form operates on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A new event. Its ID is assigned by the server
    Create,
    /// An existing event, that this visitor owns
    Edit(EventId),
}


/// Drives a submission form through its [`SubmissionState`]s
pub struct Orchestrator<T, P, V, C>
where
    T: SubmissionTransport,
    P: ConsentPrompt,
    V: SubmissionView,
    C: Clock,
{
    transport: T,
    prompt: P,
    view: V,
    clock: C,

    target: Target,
    owner_name: Option<String>,
    schedule: ProgressSchedule,
    feedback_channel: Option<FeedbackSender>,

    state: Mutex<SubmissionState>,
}

impl<T, P, V, C> Orchestrator<T, P, V, C>
where
    T: SubmissionTransport,
    P: ConsentPrompt,
    V: SubmissionView,
    C: Clock,
{
    /// An orchestrator for a form that creates a new event
    pub fn new(transport: T, prompt: P, view: V, clock: C) -> Self {
        Self {
            transport, prompt, view, clock,
            target: Target::Create,
            owner_name: None,
            schedule: ProgressSchedule::default(),
            feedback_channel: None,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    /// An orchestrator for a form that edits an existing event
    pub fn for_edit(id: EventId, transport: T, prompt: P, view: V, clock: C) -> Self {
        let mut orchestrator = Self::new(transport, prompt, view, clock);
        orchestrator.target = Target::Edit(id);
        orchestrator
    }

    /// Set the display name the server labels the change with. By default, the `responsible` field is used
    pub fn with_owner_name(mut self, owner_name: String) -> Self {
        self.owner_name = Some(owner_name);
        self
    }

    pub fn with_schedule(mut self, schedule: ProgressSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Report progress to a channel created by [`progress::feedback_channel`]
    pub fn with_feedback_channel(mut self, channel: FeedbackSender) -> Self {
        self.feedback_channel = Some(channel);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn state(&self) -> SubmissionState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, SubmissionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, new_state: SubmissionState) {
        log::debug!("Submission state: {}", new_state);
        *self.lock_state() = new_state;
    }

    /// Submit the form.
    ///
    /// The form is validated first. Then, in case `consent` holds no decision yet, the visitor is prompted, and the answer is recorded
    /// (declining does not prevent the submission). Then a single request is sent, while progress stages are revealed.
    ///
    /// Calling this while a previous call is still pending, or after a success, does nothing.
    pub async fn submit<J: CookieJar>(&self, form: &FormFields, consent: &ConsentRecord<'_, J>) -> SubmitOutcome {
        // Check and enter the next state at once, so that no other call can slip in.
        // The view is only called once the lock is released, as it may want to read the state.
        let gate = {
            let mut state = self.lock_state();
            if state.submit_enabled() == false {
                log::warn!("Ignoring a submission while {}", *state);
                return SubmitOutcome::Rejected;
            }

            let violations = validate(form, self.clock.now());
            if violations.is_empty() {
                let needs_consent = consent.decision().is_none();
                *state = match needs_consent {
                    true => SubmissionState::ConsentPending,
                    false => SubmissionState::InFlight,
                };
                log::debug!("Submission state: {}", *state);
                Ok(needs_consent)
            } else {
                Err(violations)
            }
        };
        let needs_consent = match gate {
            Ok(needs_consent) => needs_consent,
            Err(violations) => {
                log::info!("Not submitting a form with {} error(s)", violations.len());
                self.view.show_validation_errors(&violations);
                return SubmitOutcome::Invalid(violations);
            },
        };

        if needs_consent {
            let decision = self.prompt.ask().await;
            consent.record(decision);
            self.set_state(SubmissionState::InFlight);
        }

        self.view.set_submit_enabled(false);
        feedback(self.feedback_channel.as_ref(), SubmissionEvent::Started);

        let owner_name = self.owner_name.as_deref().unwrap_or(&form.responsible);
        let known_id = match &self.target {
            Target::Create => None,
            Target::Edit(id) => Some(id.clone()),
        };
        let submission = EventSubmission::from_form(form, owner_name, known_id.clone());

        let request = self.send(&submission);
        let pacing = self.schedule.play(self.feedback_channel.as_ref());
        tokio::pin!(request);
        tokio::pin!(pacing);
        let mut pacing_done = false;
        let result = loop {
            tokio::select! {
                result = &mut request => break result,
                _ = &mut pacing, if pacing_done == false => pacing_done = true,
            }
        };

        let outcome = match result {
            Ok(response) if response.success => {
                let id = known_id.or_else(|| response.id.and_then(|id| id.parse().ok()));
                log::info!("Submission succeeded (event {:?})", id);
                SubmitOutcome::Succeeded(id)
            },
            Ok(response) => {
                let message = response.error
                    .filter(|e| e.trim().is_empty() == false)
                    .unwrap_or_else(|| UNEXPLAINED_FAILURE_MESSAGE.to_string());
                log::warn!("Server refused the submission: {}", message);
                SubmitOutcome::Failed(FailureReason::Server(message))
            },
            Err(err) => {
                log::warn!("Submission request failed: {}", err);
                SubmitOutcome::Failed(FailureReason::Transport)
            },
        };

        match &outcome {
            SubmitOutcome::Succeeded(id) => {
                self.set_state(SubmissionState::Succeeded{ id: id.clone() });
                feedback(self.feedback_channel.as_ref(), SubmissionEvent::Finished{ success: true });
                self.view.show_confirmation(id.as_ref());
            },
            SubmitOutcome::Failed(reason) => {
                self.set_state(SubmissionState::Failed(reason.clone()));
                feedback(self.feedback_channel.as_ref(), SubmissionEvent::Finished{ success: false });
                self.view.set_submit_enabled(true);
                self.view.show_failure(reason.message());
            },
            SubmitOutcome::Invalid(_) | SubmitOutcome::Rejected => {},
        }
        outcome
    }

    async fn send(&self, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn std::error::Error>> {
        match &self.target {
            Target::Create => self.transport.create_event(submission).await,
            Target::Edit(id) => self.transport.edit_event(id, submission).await,
        }
    }
}
