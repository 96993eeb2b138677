//! Page-timing recorder types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::EventId;

/// Stable identifier for one page visit.
pub type VisitId = Uuid;

/// A developer-supplied marker recorded during a visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMarker {
    /// Marker name.
    pub name: String,
    /// Time the marker was recorded.
    pub at: DateTime<Utc>,
    /// Optional free-form metadata.
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

/// In-progress or completed state for one page visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVisit {
    /// Stable visit id.
    pub visit_id: VisitId,
    /// Logical page identifier (e.g. a route name or screen class).
    pub page_id: String,
    /// Human-readable page name.
    pub page_name: String,
    /// Optional navigation route.
    pub route: Option<String>,
    /// Time the visit started.
    pub start_at: DateTime<Utc>,
    /// Time the first layout pass completed, if marked.
    pub first_layout_at: Option<DateTime<Utc>>,
    /// Time the page became visually complete ("appeared"), if marked.
    pub appear_at: Option<DateTime<Utc>>,
    /// Time the visit ended, if closed.
    pub end_at: Option<DateTime<Utc>>,
    /// Developer-supplied markers recorded during the visit.
    pub markers: Vec<PageMarker>,
    /// Whether this visit represents the app's cold start.
    pub is_cold_start: bool,
    /// Whether this visit was reached via a push navigation.
    pub is_push: Option<bool>,
    /// The page this visit was pushed from, if any.
    pub parent_page_id: Option<String>,
}

impl PageVisit {
    /// Milliseconds between `start_at` and `first_layout_at`, if both are
    /// known.
    pub fn load_duration_ms(&self) -> Option<i64> {
        self.first_layout_at
            .map(|t| (t - self.start_at).num_milliseconds())
    }

    /// Milliseconds between `start_at` and `appear_at`, if both are known.
    pub fn appear_duration_ms(&self) -> Option<i64> {
        self.appear_at
            .map(|t| (t - self.start_at).num_milliseconds())
    }

    /// Milliseconds between `start_at` and `end_at`, if both are known.
    pub fn total_duration_ms(&self) -> Option<i64> {
        self.end_at
            .map(|t| (t - self.start_at).num_milliseconds())
    }
}

/// The event emitted once a [`PageVisit`] is closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTimingEvent {
    /// Event id (distinct from `visit_id`, though usually derived from it
    /// by the recorder).
    pub id: EventId,
    /// The visit this timing summary describes.
    pub visit_id: VisitId,
    /// Full visit state at the time of closing.
    pub visit: PageVisit,
    /// Derived load duration, in milliseconds.
    pub load_duration_ms: Option<i64>,
    /// Derived appear duration, in milliseconds.
    pub appear_duration_ms: Option<i64>,
    /// Derived total duration, in milliseconds.
    pub total_duration_ms: Option<i64>,
}
