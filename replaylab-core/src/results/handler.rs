//! Event builder handed to the step function.

use super::tree::{
    AnnotationCollection, Event, LabelAnnotation, PointAnnotation, ScenarioResultSet,
    SegmentAnnotation, DEFAULT_COLOR, DEFAULT_ICON,
};

/// Appends events to one scenario's result set for one step.
///
/// Seeded with the step's timestamp and close price, which every new event
/// copies as its creation time, display time and price.
pub struct ResultHandler<'a> {
    timestamp: i64,
    price: f64,
    results: &'a mut ScenarioResultSet,
}

impl<'a> ResultHandler<'a> {
    pub fn new(results: &'a mut ScenarioResultSet, timestamp: i64, price: f64) -> Self {
        Self {
            timestamp,
            price,
            results,
        }
    }

    /// Append a new event and return a handle to modify it.
    pub fn new_event(&mut self, label: impl Into<String>) -> EventHandle<'_> {
        self.results.events.push(Event {
            created_on: self.timestamp,
            time: self.timestamp,
            price: self.price,
            label: label.into(),
            icon: DEFAULT_ICON.to_string(),
            color: DEFAULT_COLOR.to_string(),
            annotations: None,
        });
        let event = self
            .results
            .events
            .last_mut()
            .expect("event was just pushed");
        EventHandle { event }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

/// Mutable view of exactly one event. Setters chain by value.
pub struct EventHandle<'h> {
    event: &'h mut Event,
}

impl<'h> EventHandle<'h> {
    pub fn set_color(self, color: impl Into<String>) -> Self {
        self.event.color = color.into();
        self
    }

    pub fn set_icon(self, icon: impl Into<String>) -> Self {
        self.event.icon = icon.into();
        self
    }

    pub fn set_price(self, price: f64) -> Self {
        self.event.price = price;
        self
    }

    pub fn set_time(self, time: i64) -> Self {
        self.event.time = time;
        self
    }

    pub fn add_point(self, point: PointAnnotation) -> Self {
        self.event
            .annotations
            .get_or_insert_with(AnnotationCollection::default)
            .points
            .push(point);
        self
    }

    pub fn add_segment(self, segment: SegmentAnnotation) -> Self {
        self.event
            .annotations
            .get_or_insert_with(AnnotationCollection::default)
            .segments
            .push(segment);
        self
    }

    pub fn add_label(self, label: LabelAnnotation) -> Self {
        self.event
            .annotations
            .get_or_insert_with(AnnotationCollection::default)
            .labels
            .push(label);
        self
    }

    pub fn event(&self) -> &Event {
        &*self.event
    }
}
