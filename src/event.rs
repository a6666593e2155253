//! Community events, as published in the canonical dataset

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use chrono::NaiveDate;


/// The opaque, stable identifier of an event.
///
/// It is assigned by the server when an event is created, and never changes afterwards.
/// An `EventId` is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    content: String,
}

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl FromStr for EventId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("An event ID cannot be empty".to_string());
        }
        Ok(Self { content: s.to_string() })
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.content)
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<EventId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}



/// An event from the canonical dataset (`/events.json`).
///
/// This crate never modifies events, it only reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    date: NaiveDate,
    /// Local time of day, as a zero-padded `HH:MM` string
    start: String,
    /// Local time of day, as a zero-padded `HH:MM` string
    end: String,
    title: String,
    location: String,
    responsible: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl Event {
    pub fn new(id: EventId, date: NaiveDate, start: String, end: String, title: String, location: String, responsible: String) -> Self {
        Self {
            id, date, start, end, title, location, responsible,
            description: None,
            link: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn id(&self) -> &EventId { &self.id }
    pub fn date(&self) -> NaiveDate { self.date }
    pub fn start(&self) -> &str { &self.start }
    pub fn end(&self) -> &str { &self.end }
    pub fn title(&self) -> &str { &self.title }
    pub fn location(&self) -> &str { &self.location }
    pub fn responsible(&self) -> &str { &self.responsible }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn link(&self) -> Option<&str> { self.link.as_deref() }

    /// Whether this event takes place `today` or later.
    ///
    /// This is a calendar-date comparison: an event that happens today is still upcoming, whatever its time of day.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        is_upcoming(self.date, today)
    }
}

/// Whether a date has not passed yet, compared to `today`
pub fn is_upcoming(date: NaiveDate, today: NaiveDate) -> bool {
    date >= today
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_are_rejected() {
        assert!("".parse::<EventId>().is_err());
        assert!(serde_json::from_str::<EventId>(r#""""#).is_err());
        assert_eq!("abc".parse::<EventId>().unwrap().as_str(), "abc");
    }

    #[test]
    fn deserialize_dataset_record() {
        let json = r#"{
            "id": "2026-10-20-brunch",
            "date": "2026-10-20",
            "start": "10:00",
            "end": "12:00",
            "title": "Brunch",
            "location": "Föreningslokalen",
            "responsible": "Kim"
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.id().as_str(), "2026-10-20-brunch");
        assert_eq!(event.date(), NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert_eq!(event.description(), None);
        assert_eq!(event.link(), None);
    }

    #[test]
    fn upcoming_is_a_date_comparison() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert!(is_upcoming(today, today));
        assert!(is_upcoming(today.succ_opt().unwrap(), today));
        assert!(!is_upcoming(today.pred_opt().unwrap(), today));
    }
}
