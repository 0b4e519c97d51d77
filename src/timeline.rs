// ⏳ Timeline Builder - birth + treatments per selected calf

use crate::error::RecordError;
use crate::records::{CalfRecord, TreatmentRecord};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventCategory {
    Birth,
    Treatment,
}

impl EventCategory {
    /// Legend name shown next to the chart
    pub fn name(&self) -> &str {
        match self {
            EventCategory::Birth => "Nascimento",
            EventCategory::Treatment => "Tratamento",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub label: String,
    pub date: NaiveDate,
    pub category: EventCategory,
}

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Selecione pelo menos uma bezerra.")]
    EmptySelection,

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Events for each selected ear tag, in selection order.
///
/// A tag with no registry entry contributes nothing, not even its
/// treatments. Repeated tags are emitted again. Events are not sorted by
/// date; see [`order_for_display`].
pub fn build_timeline<S: AsRef<str>>(
    selected: &[S],
    registry: &[CalfRecord],
    treatments: &[TreatmentRecord],
) -> Result<Vec<TimelineEvent>, RecordError> {
    let mut events = Vec::new();

    for tag in selected {
        let tag: &str = tag.as_ref();
        let calf = match registry.iter().find(|c| c.ear_tag == tag) {
            Some(calf) => calf,
            None => continue,
        };

        events.push(TimelineEvent {
            label: format!("{} - Nascimento", tag),
            date: calf.birth_day()?,
            category: EventCategory::Birth,
        });

        for treatment in treatments.iter().filter(|t| t.calf_ear_tag == tag) {
            events.push(TimelineEvent {
                label: format!("{} - {}", tag, treatment.reason),
                date: treatment.first_dose_day()?,
                category: EventCategory::Treatment,
            });
        }
    }

    Ok(events)
}

/// Same as [`build_timeline`], but an empty selection is an error the
/// presentation layer shows instead of an empty chart
pub fn request_timeline<S: AsRef<str>>(
    selected: &[S],
    registry: &[CalfRecord],
    treatments: &[TreatmentRecord],
) -> Result<Vec<TimelineEvent>, TimelineError> {
    if selected.is_empty() {
        return Err(TimelineError::EmptySelection);
    }
    Ok(build_timeline(selected, registry, treatments)?)
}

/// Category-axis order: by label, then by date
pub fn order_for_display(mut events: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
    events.sort_by(|a, b| a.label.cmp(&b.label).then(a.date.cmp(&b.date)));
    events
}

/// First and last event dates, for scaling the horizontal axis
pub fn date_span(events: &[TimelineEvent]) -> Option<(NaiveDate, NaiveDate)> {
    let first = events.iter().map(|e| e.date).min()?;
    let last = events.iter().map(|e| e.date).max()?;
    Some((first, last))
}
