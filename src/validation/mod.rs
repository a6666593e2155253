//! Validation of the submission form
//!
//! [`validate`] checks a whole form at once. It is what gates a submission. \
//! [`LiveValidator`] tracks which errors are displayed while the visitor fills the form in.

use std::fmt::{Display, Formatter};

use bitflags::bitflags;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::traits::MarkdownSanitizer;

pub mod rules;
pub use rules::{RuleKind, Trigger};
mod live;
pub use live::LiveValidator;


/// A field of the submission form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    Date,
    Start,
    End,
    Location,
    Responsible,
    Description,
    Link,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Title, Field::Date, Field::Start, Field::End,
        Field::Location, Field::Responsible, Field::Description, Field::Link,
    ];

    pub fn flag(&self) -> Fields {
        match self {
            Field::Title => Fields::TITLE,
            Field::Date => Fields::DATE,
            Field::Start => Fields::START,
            Field::End => Fields::END,
            Field::Location => Fields::LOCATION,
            Field::Responsible => Fields::RESPONSIBLE,
            Field::Description => Fields::DESCRIPTION,
            Field::Link => Fields::LINK,
        }
    }

    /// The name of this field, as sent to the server
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Date => "date",
            Field::Start => "start",
            Field::End => "end",
            Field::Location => "location",
            Field::Responsible => "responsible",
            Field::Description => "description",
            Field::Link => "link",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

bitflags! {
    /// A set of [`Field`]s
    pub struct Fields: u8 {
        const TITLE = 1;
        const DATE = 2;
        const START = 4;
        const END = 8;
        const LOCATION = 16;
        const RESPONSIBLE = 32;
        const DESCRIPTION = 64;
        const LINK = 128;
        /// Fields that must not be left empty
        const REQUIRED = Self::TITLE.bits | Self::DATE.bits | Self::START.bits | Self::END.bits | Self::LOCATION.bits | Self::RESPONSIBLE.bits;
    }
}


/// The current values of the submission form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    pub title: String,
    /// ISO `YYYY-MM-DD` date
    pub date: String,
    /// Zero-padded `HH:MM` time
    pub start: String,
    /// Zero-padded `HH:MM` time
    pub end: String,
    pub location: String,
    pub responsible: String,
    /// Markdown
    pub description: String,
    pub link: String,
}

impl FormFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Date => &self.date,
            Field::Start => &self.start,
            Field::End => &self.end,
            Field::Location => &self.location,
            Field::Responsible => &self.responsible,
            Field::Description => &self.description,
            Field::Link => &self.link,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Date => &mut self.date,
            Field::Start => &mut self.start,
            Field::End => &mut self.end,
            Field::Location => &mut self.location,
            Field::Responsible => &mut self.responsible,
            Field::Description => &mut self.description,
            Field::Link => &mut self.link,
        };
        *slot = value;
    }

    /// Render the description the way the site will, or `None` in case there is no description
    pub fn description_preview(&self, sanitizer: &dyn MarkdownSanitizer) -> Option<String> {
        if self.description.trim().is_empty() {
            return None;
        }
        Some(sanitizer.to_safe_html(&self.description))
    }
}


/// A failed rule, attached to a field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field: Field,
    pub rule: RuleKind,
    pub message: String,
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}


/// The first failing rule of a field, if any
pub fn check_field(form: &FormFields, field: Field, now: NaiveDateTime) -> Option<Violation> {
    rules::RULES.iter()
        .filter(|rule| rule.target() == field)
        .find_map(|rule| {
            rule.check(form, now).map(|message| Violation {
                field,
                rule: *rule,
                message: message.to_string(),
            })
        })
}

/// Check every rule of a form at once.
///
/// Returns at most one violation per field, in field order. The form can be submitted when this is empty.
pub fn validate(form: &FormFields, now: NaiveDateTime) -> Vec<Violation> {
    Field::ALL.iter()
        .filter_map(|field| check_field(form, *field, now))
        .collect()
}
