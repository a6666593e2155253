//! The seams between this crate and its environment (browser, network, page, wall clock)

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::EventId;
use crate::cookie::SetCookie;
use crate::consent::ConsentDecision;
use crate::submission::{EventSubmission, SubmissionResponse};
use crate::validation::Violation;


/// Gives the current local wall-clock time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}


/// The cookie store of the browser
pub trait CookieJar {
    /// Returns the raw (still URL-encoded) value of a cookie, if it is set
    fn get(&self, name: &str) -> Option<String>;
    /// Sets or deletes a cookie, depending on its `Max-Age`
    fn set(&self, cookie: SetCookie);
}


/// Something that can provide the canonical list of published events
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the canonical dataset.
    ///
    /// The returned records are not validated yet, so that a single malformed record does not spoil the whole dataset.
    async fn fetch_events(&self) -> Result<Vec<serde_json::Value>, Box<dyn Error>>;
}


/// Something that performs the durable write of an event
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Ask for a new event to be created.
    ///
    /// `Err` means that no interpretable response was received.
    async fn create_event(&self, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>>;

    /// Ask for an existing event to be modified.
    ///
    /// `Err` means that no interpretable response was received.
    async fn edit_event(&self, id: &EventId, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>>;
}


/// The consent banner, asking the visitor whether cookies may be stored
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Show the prompt, and resolve once the visitor explicitly accepted or declined
    async fn ask(&self) -> ConsentDecision;
}


/// The submission form, as seen by the [`Orchestrator`](crate::submission::Orchestrator)
pub trait SubmissionView: Send + Sync {
    /// Enable or disable the submit button
    fn set_submit_enabled(&self, enabled: bool);
    /// Display the inline errors of a rejected submission
    fn show_validation_errors(&self, errors: &[Violation]);
    /// Replace the form by a confirmation
    fn show_confirmation(&self, id: Option<&EventId>);
    /// Display why a submission failed
    fn show_failure(&self, message: &str);
}


/// Turns user-provided Markdown into safe HTML.
///
/// The same implementation is used by the site build and by the submission preview, so that both render identically.
pub trait MarkdownSanitizer {
    fn to_safe_html(&self, markdown: &str) -> String;
}


// Shared handles, so that callers can keep an eye on what they gave away

#[async_trait]
impl<S: EventSource + ?Sized> EventSource for Arc<S> {
    async fn fetch_events(&self) -> Result<Vec<serde_json::Value>, Box<dyn Error>> {
        (**self).fetch_events().await
    }
}

#[async_trait]
impl<T: SubmissionTransport + ?Sized> SubmissionTransport for Arc<T> {
    async fn create_event(&self, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>> {
        (**self).create_event(submission).await
    }
    async fn edit_event(&self, id: &EventId, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>> {
        (**self).edit_event(id, submission).await
    }
}

#[async_trait]
impl<P: ConsentPrompt + ?Sized> ConsentPrompt for Arc<P> {
    async fn ask(&self) -> ConsentDecision {
        (**self).ask().await
    }
}

impl<V: SubmissionView + ?Sized> SubmissionView for Arc<V> {
    fn set_submit_enabled(&self, enabled: bool) { (**self).set_submit_enabled(enabled) }
    fn show_validation_errors(&self, errors: &[Violation]) { (**self).show_validation_errors(errors) }
    fn show_confirmation(&self, id: Option<&EventId>) { (**self).show_confirmation(id) }
    fn show_failure(&self, message: &str) { (**self).show_failure(message) }
}


/// A [`Clock`] that always returns the same instant. This is mostly useful for tests
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// The local wall clock of this machine
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
