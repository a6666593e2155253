use std::collections::BTreeMap;

use crate::traits::Clock;
use super::{Field, FormFields, Violation, check_field, validate};
use super::rules::{RULES, Trigger};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Interaction {
    Change,
    Blur,
}

/// Tracks the errors displayed next to each field while the visitor fills the form in.
///
/// * an error that is checked on blur (e.g. an empty required field) is shown when its field loses focus
/// * an error that involves several fields (e.g. an end time before the start time) is shown as soon as a value changes
/// * any displayed error disappears as soon as a change makes it pass, without waiting for a blur
pub struct LiveValidator<C: Clock> {
    form: FormFields,
    shown: BTreeMap<Field, Violation>,
    clock: C,
}

impl<C: Clock> LiveValidator<C> {
    pub fn new(clock: C) -> Self {
        Self::with_values(FormFields::default(), clock)
    }

    /// Start from pre-filled values (e.g. when editing an existing event). No error is shown until the visitor interacts
    pub fn with_values(form: FormFields, clock: C) -> Self {
        Self { form, shown: BTreeMap::new(), clock }
    }

    pub fn form(&self) -> &FormFields {
        &self.form
    }

    /// The error currently displayed for a field
    pub fn error(&self, field: Field) -> Option<&str> {
        self.shown.get(&field).map(|v| v.message.as_str())
    }

    /// Every error currently displayed, in field order
    pub fn errors(&self) -> Vec<&Violation> {
        self.shown.values().collect()
    }

    /// Whether the form could be submitted right now.
    ///
    /// This re-checks every rule, so that a required field that has never been focused counts as well.
    pub fn is_submittable(&self) -> bool {
        validate(&self.form, self.clock.now()).is_empty()
    }

    /// The visitor changed the value of a field
    pub fn change(&mut self, field: Field, value: String) {
        self.form.set(field, value);
        self.refresh(field, Interaction::Change);
    }

    /// A field lost focus
    pub fn blur(&mut self, field: Field) {
        self.refresh(field, Interaction::Blur);
    }

    /// Check the whole form before submitting it.
    ///
    /// This does not rely on the errors collected so far: every rule is checked again, and every failure is displayed.
    pub fn validate_for_submit(&mut self) -> Result<(), Vec<Violation>> {
        let violations = validate(&self.form, self.clock.now());
        self.shown = violations.iter()
            .map(|v| (v.field, v.clone()))
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            log::debug!("Form has {} error(s)", violations.len());
            Err(violations)
        }
    }

    fn refresh(&mut self, source: Field, interaction: Interaction) {
        let now = self.clock.now();
        for target in affected_fields(source) {
            match check_field(&self.form, target, now) {
                None => {
                    if self.shown.remove(&target).is_some() {
                        log::trace!("Cleared error on {}", target);
                    }
                },
                Some(violation) => {
                    let show = self.shown.contains_key(&target)
                        || (interaction == Interaction::Blur && target == source)
                        || (interaction == Interaction::Change && violation.rule.trigger() == Trigger::Change);
                    if show {
                        log::trace!("Showing error on {}: {}", target, violation.message);
                        self.shown.insert(target, violation);
                    }
                },
            }
        }
    }
}

/// The fields whose errors may change when `source` changes
fn affected_fields(source: Field) -> Vec<Field> {
    let mut targets = source.flag();
    for rule in RULES.iter() {
        if rule.dependencies().contains(source.flag()) {
            targets |= rule.target().flag();
        }
    }
    Field::ALL.iter()
        .cloned()
        .filter(|field| targets.intersects(field.flag()))
        .collect()
}
