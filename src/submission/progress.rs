//! Utilities to give feedback while a submission is in flight
//!
//! The server does not report any progress: it only answers once the change request has been opened. \
//! To make the wait feel shorter, a [`ProgressSchedule`] reveals stages after fixed delays. These stages are cosmetic: they say nothing about where the request actually is.

use std::fmt::{Display, Error, Formatter};
use std::time::Duration;

/// An event that happens during a submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// Nothing has been submitted yet
    NotStarted,
    /// The request is about to be sent
    Started,
    /// A progress stage should be displayed
    Stage{ index: usize, label: String },
    /// The server answered, or could not be reached
    Finished{ success: bool },
}

impl Display for SubmissionEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SubmissionEvent::NotStarted => write!(f, "Not started"),
            SubmissionEvent::Started => write!(f, "Submission has started..."),
            SubmissionEvent::Stage{index, label} => write!(f, "[{}] {}", index + 1, label),
            SubmissionEvent::Finished{success} => match success {
                true => write!(f, "Submission succeeded"),
                false => write!(f, "Submission failed"),
            }
        }
    }
}

impl Default for SubmissionEvent {
    fn default() -> Self {
        Self::NotStarted
    }
}


/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<SubmissionEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<SubmissionEvent>;

/// Create a feeback channel, that can be used to display the current progress of a submission
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(SubmissionEvent::default())
}

/// Send an event to the listener, if any
pub(crate) fn feedback(channel: Option<&FeedbackSender>, event: SubmissionEvent) {
    if let Some(sender) = channel {
        // Nobody listening is fine
        let _ = sender.send(event);
    }
}


/// A stage of the progress indicator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressStage {
    /// How long to wait after the previous stage (or after the start) before showing this one
    pub delay: Duration,
    pub label: String,
}

impl ProgressStage {
    pub fn new(delay_ms: u64, label: &str) -> Self {
        Self { delay: Duration::from_millis(delay_ms), label: label.to_string() }
    }
}

/// A fixed sequence of `(delay, label)` stages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressSchedule {
    stages: Vec<ProgressStage>,
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        Self::new(vec![
            ProgressStage::new(100, "Skickar evenemanget..."),
            ProgressStage::new(1500, "Skapar ändringsförslag..."),
            ProgressStage::new(4000, "Väntar på bekräftelse..."),
        ])
    }
}

impl ProgressSchedule {
    pub fn new(stages: Vec<ProgressStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[ProgressStage] {
        &self.stages
    }

    /// Reveal every stage in turn, as time goes by.
    ///
    /// This only depends on elapsed time. Callers are expected to race it against the actual request, and to stop polling it once the request has completed.
    pub async fn play(&self, channel: Option<&FeedbackSender>) {
        for (index, stage) in self.stages.iter().enumerate() {
            tokio::time::sleep(stage.delay).await;
            log::trace!("Progress stage {}: {}", index, stage.label);
            feedback(channel, SubmissionEvent::Stage{ index, label: stage.label.clone() });
        }
    }
}
