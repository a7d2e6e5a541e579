//! Declarative click tracking: elements opt in with
//! `data-track-event="click"` and describe the event through
//! `data-event-category`, `data-event-action`, `data-event-name`, and
//! `data-event-value`.

use std::sync::Arc;

use matomo_core::{TrackerError, TrackerResult};
use tracing::{debug, warn};

use crate::document::{ClickHandler, ClickTarget};
use crate::tracker::{EventParams, Tracker};

pub const TRACK_EVENT_ATTRIBUTE: &str = "data-track-event";
pub const CLICK_TRIGGER: &str = "click";
pub const CATEGORY_ATTRIBUTE: &str = "data-event-category";
pub const ACTION_ATTRIBUTE: &str = "data-event-action";
pub const NAME_ATTRIBUTE: &str = "data-event-name";
pub const VALUE_ATTRIBUTE: &str = "data-event-value";

impl Tracker {
    /// Bind a click listener to every element marked
    /// `data-track-event="click"` and return how many were bound.
    ///
    /// Validation happens when the element is clicked: a listener whose
    /// element lacks a category or action fails with
    /// [`TrackerError::MissingField`] inside the click callback. That error
    /// never reaches the caller of `track_events`. Each call binds again, so
    /// calling twice tracks every click twice.
    ///
    /// Listeners hold the document weakly; a click dispatched after the last
    /// strong handle is gone is ignored.
    pub fn track_events(&self) -> usize {
        let tracker = self.downgrade();
        let handler: ClickHandler =
            Arc::new(move |target: &ClickTarget| -> TrackerResult<()> {
                match tracker.upgrade() {
                    Some(tracker) => tracker.track_click(target),
                    None => Ok(()),
                }
            });

        let bound = self
            .document()
            .add_click_listeners(TRACK_EVENT_ATTRIBUTE, CLICK_TRIGGER, handler);
        debug!(bound, "declarative click tracking bound");
        bound
    }

    /// Handle one click on a declaratively tracked element.
    pub fn track_click(&self, target: &ClickTarget) -> TrackerResult<()> {
        let category = target.attribute(CATEGORY_ATTRIBUTE);
        let action = target.attribute(ACTION_ATTRIBUTE);

        let (Some(category), Some(action)) = (category, action) else {
            let mut fields = Vec::new();
            if category.is_none() {
                fields.push("category");
            }
            if action.is_none() {
                fields.push("action");
            }
            warn!(?fields, "tracked element is missing event fields");
            return Err(TrackerError::missing("trackEvents", fields));
        };

        let mut params = EventParams::new(category, action);
        params.name = target.attribute(NAME_ATTRIBUTE).map(str::to_string);
        params.value = target
            .attribute(VALUE_ATTRIBUTE)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());

        self.track_event(params)
    }
}
