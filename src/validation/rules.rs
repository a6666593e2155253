//! The individual rules of the submission form

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use url::Url;

use super::{Field, Fields, FormFields};

/// How long a start time may lie in the past, for an event that takes place today
pub const NEAR_PAST_GRACE_MINUTES: i64 = 120;

/// When an error produced by a rule is first displayed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// When the target field loses focus
    Blur,
    /// As soon as one of the fields the rule depends on changes
    Change,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    Required(Field),
    DateFormat,
    PastDate,
    TimeFormat(Field),
    /// `end` must be after `start`
    Ordering,
    /// `start` must not be too far in the past, for an event that takes place today
    NearPast,
    LinkFormat,
}

/// Every rule, by decreasing priority. Only the first failing rule of a field is reported
pub(crate) const RULES: [RuleKind; 13] = [
    RuleKind::Required(Field::Title),
    RuleKind::Required(Field::Date),
    RuleKind::Required(Field::Start),
    RuleKind::Required(Field::End),
    RuleKind::Required(Field::Location),
    RuleKind::Required(Field::Responsible),
    RuleKind::DateFormat,
    RuleKind::TimeFormat(Field::Start),
    RuleKind::TimeFormat(Field::End),
    RuleKind::PastDate,
    RuleKind::Ordering,
    RuleKind::NearPast,
    RuleKind::LinkFormat,
];

impl RuleKind {
    /// The field an error of this rule is attached to
    pub fn target(&self) -> Field {
        match self {
            RuleKind::Required(field) | RuleKind::TimeFormat(field) => *field,
            RuleKind::DateFormat | RuleKind::PastDate => Field::Date,
            RuleKind::Ordering => Field::End,
            RuleKind::NearPast => Field::Start,
            RuleKind::LinkFormat => Field::Link,
        }
    }

    /// The fields whose value this rule reads
    pub fn dependencies(&self) -> Fields {
        match self {
            RuleKind::Ordering => Fields::START | Fields::END,
            RuleKind::NearPast => Fields::DATE | Fields::START,
            _ => self.target().flag(),
        }
    }

    pub fn trigger(&self) -> Trigger {
        match self {
            RuleKind::PastDate | RuleKind::Ordering | RuleKind::NearPast => Trigger::Change,
            _ => Trigger::Blur,
        }
    }

    /// Check this rule. Returns the (Swedish) error message in case it fails
    pub fn check(&self, form: &FormFields, now: NaiveDateTime) -> Option<&'static str> {
        let failed = match self {
            RuleKind::Required(field) => form.get(*field).trim().is_empty(),
            RuleKind::DateFormat => {
                let date = form.date.trim();
                date.is_empty() == false && parse_date(date).is_none()
            },
            RuleKind::PastDate => match parse_date(&form.date) {
                Some(date) => date < now.date(),
                None => false,
            },
            RuleKind::TimeFormat(field) => {
                let time = form.get(*field).trim();
                time.is_empty() == false && parse_time(time).is_none()
            },
            RuleKind::Ordering => match (parse_time(&form.start), parse_time(&form.end)) {
                (Some(start), Some(end)) => end <= start,
                _ => false,
            },
            RuleKind::NearPast => match (parse_date(&form.date), parse_time(&form.start)) {
                (Some(date), Some(start)) => is_too_far_in_the_past(date, start, now),
                _ => false,
            },
            RuleKind::LinkFormat => {
                let link = form.link.trim();
                link.is_empty() == false && is_web_link(link) == false
            },
        };

        if failed {
            Some(self.message())
        } else {
            None
        }
    }

    fn message(&self) -> &'static str {
        match self {
            RuleKind::Required(Field::Title) => "Ange en titel",
            RuleKind::Required(Field::Date) => "Ange ett datum",
            RuleKind::Required(Field::Start) => "Ange en starttid",
            RuleKind::Required(Field::End) => "Ange en sluttid",
            RuleKind::Required(Field::Location) => "Ange en plats",
            RuleKind::Required(Field::Responsible) => "Ange vem som är ansvarig",
            RuleKind::Required(_) => "Fältet är obligatoriskt",
            RuleKind::DateFormat => "Ange datumet som ÅÅÅÅ-MM-DD",
            RuleKind::PastDate => "Datumet har redan passerat",
            RuleKind::TimeFormat(_) => "Ange tiden som TT:MM",
            RuleKind::Ordering => "Sluttiden måste vara efter starttiden",
            RuleKind::NearPast => "Starttiden har redan passerat",
            RuleKind::LinkFormat => "Länken måste börja med http:// eller https://",
        }
    }
}

/// Parse an ISO `YYYY-MM-DD` date
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse a zero-padded `HH:MM` time.
///
/// Zero-padding is mandatory: it is what makes these strings comparable as text, which is how the site build sorts events.
pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

fn is_too_far_in_the_past(date: NaiveDate, start: NaiveTime, now: NaiveDateTime) -> bool {
    if date != now.date() {
        return false;
    }
    now - date.and_time(start) > Duration::minutes(NEAR_PAST_GRACE_MINUTES)
}

fn is_web_link(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => (url.scheme() == "http" || url.scheme() == "https") && url.host().is_some(),
        Err(_) => false,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(14, 0, 0).unwrap()
    }

    fn form(date: &str, start: &str, end: &str) -> FormFields {
        FormFields {
            date: date.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            ..FormFields::default()
        }
    }

    #[test]
    fn ordering() {
        assert!(RuleKind::Ordering.check(&form("2026-10-20", "10:00", "09:00"), now()).is_some());
        assert!(RuleKind::Ordering.check(&form("2026-10-20", "10:00", "10:00"), now()).is_some());
        assert!(RuleKind::Ordering.check(&form("2026-10-20", "10:00", "10:01"), now()).is_none());
        assert_eq!(RuleKind::Ordering.target(), Field::End);
    }

    #[test]
    fn near_past_grace_window() {
        // now is 14:00
        assert!(RuleKind::NearPast.check(&form("2026-10-16", "11:59", ""), now()).is_some());
        assert!(RuleKind::NearPast.check(&form("2026-10-16", "12:00", ""), now()).is_none());
        assert!(RuleKind::NearPast.check(&form("2026-10-16", "13:30", ""), now()).is_none());
        assert!(RuleKind::NearPast.check(&form("2026-10-16", "23:00", ""), now()).is_none());
    }

    #[test]
    fn near_past_ignores_other_days() {
        for start in ["00:00", "08:00", "11:59", "13:59"].iter() {
            assert!(RuleKind::NearPast.check(&form("2026-10-17", start, ""), now()).is_none());
            assert!(RuleKind::NearPast.check(&form("2027-01-01", start, ""), now()).is_none());
        }
    }

    #[test]
    fn times_must_be_zero_padded() {
        assert!(parse_time("09:05").is_some());
        assert!(parse_time("9:05").is_none());
        assert!(parse_time("24:00").is_none());
        assert!(parse_time("0905").is_none());
        assert!(RuleKind::TimeFormat(Field::Start).check(&form("", "9:05", ""), now()).is_some());
        assert!(RuleKind::TimeFormat(Field::Start).check(&form("", "", ""), now()).is_none());
    }

    #[test]
    fn past_dates() {
        assert!(RuleKind::PastDate.check(&form("2026-10-15", "", ""), now()).is_some());
        assert!(RuleKind::PastDate.check(&form("2026-10-16", "", ""), now()).is_none());
        assert!(RuleKind::DateFormat.check(&form("16/10/2026", "", ""), now()).is_some());
    }

    #[test]
    fn links() {
        let mut f = FormFields::default();
        assert!(RuleKind::LinkFormat.check(&f, now()).is_none());
        f.link = "https://example.org/event".to_string();
        assert!(RuleKind::LinkFormat.check(&f, now()).is_none());
        f.link = "javascript:alert(1)".to_string();
        assert!(RuleKind::LinkFormat.check(&f, now()).is_some());
        f.link = "www.example.org".to_string();
        assert!(RuleKind::LinkFormat.check(&f, now()).is_some());
    }

    #[test]
    fn required_fields_are_trimmed() {
        let mut f = FormFields::default();
        f.title = "   ".to_string();
        assert_eq!(RuleKind::Required(Field::Title).check(&f, now()), Some("Ange en titel"));
        f.title = " Brunch ".to_string();
        assert_eq!(RuleKind::Required(Field::Title).check(&f, now()), None);
    }
}
