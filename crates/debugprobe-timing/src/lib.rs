//! The page-timing recorder.
//!
//! Tracks one [`PageVisit`] per `mark_page_start` call through a strict
//! forward timeline (`start -> first_layout -> appear -> markers* ->
//! end`); calls after `end` are ignored rather than erroring, since a
//! late-arriving timing signal from a host UI thread is expected, not
//! exceptional. `mark_page_end` derives the three duration fields,
//! emits a [`PageTimingEvent`] via the kernel's `EventBus`, and discards
//! the visit's state.

use chrono::Utc;
use debugprobe_kernel::EventBus;
use debugprobe_types::{PageMarker, PageTimingEvent, PageVisit, VisitId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Arguments describing a new page visit.
#[derive(Debug, Clone)]
pub struct PageVisitStart {
    /// Logical page identifier.
    pub page_id: String,
    /// Human-readable page name.
    pub page_name: String,
    /// Optional navigation route.
    pub route: Option<String>,
    /// Whether this visit represents the app's cold start.
    pub is_cold_start: bool,
    /// Whether this visit was reached via a push navigation.
    pub is_push: Option<bool>,
    /// The page this visit was pushed from, if any.
    pub parent_page_id: Option<String>,
}

/// Records in-progress [`PageVisit`]s and emits a [`PageTimingEvent`]
/// once each one closes.
pub struct TimingRecorder {
    visits: Mutex<HashMap<VisitId, PageVisit>>,
    event_bus: Arc<EventBus>,
}

impl TimingRecorder {
    /// Build a recorder that publishes through `event_bus`.
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            visits: Mutex::new(HashMap::new()),
            event_bus,
        }
    }

    /// `mark_page_start` — begins tracking a new visit and returns its
    /// id.
    pub fn mark_page_start(&self, start: PageVisitStart) -> VisitId {
        let visit_id = VisitId::new_v4();
        let visit = PageVisit {
            visit_id,
            page_id: start.page_id,
            page_name: start.page_name,
            route: start.route,
            start_at: Utc::now(),
            first_layout_at: None,
            appear_at: None,
            end_at: None,
            markers: Vec::new(),
            is_cold_start: start.is_cold_start,
            is_push: start.is_push,
            parent_page_id: start.parent_page_id,
        };
        self.visits.lock().insert(visit_id, visit);
        visit_id
    }

    /// `mark_page_first_layout` — ignored if the visit is unknown or
    /// already closed.
    pub fn mark_page_first_layout(&self, visit_id: VisitId) {
        if let Some(visit) = self.visits.lock().get_mut(&visit_id) {
            visit.first_layout_at.get_or_insert(Utc::now());
        }
    }

    /// `mark_page_appear` — ignored if the visit is unknown or already
    /// closed.
    pub fn mark_page_appear(&self, visit_id: VisitId) {
        if let Some(visit) = self.visits.lock().get_mut(&visit_id) {
            visit.appear_at.get_or_insert(Utc::now());
        }
    }

    /// `add_marker` — ignored if the visit is unknown or already
    /// closed.
    pub fn add_marker(&self, visit_id: VisitId, name: impl Into<String>, metadata: HashMap<String, String>) {
        if let Some(visit) = self.visits.lock().get_mut(&visit_id) {
            visit.markers.push(PageMarker {
                name: name.into(),
                at: Utc::now(),
                metadata,
            });
        }
    }

    /// `mark_page_end` — derives the duration fields, emits a
    /// [`PageTimingEvent`], and discards the visit's tracked state. A
    /// no-op (and logs at `debug`) if `visit_id` is unknown, e.g. a
    /// duplicate `end` call.
    pub async fn mark_page_end(&self, visit_id: VisitId) {
        let visit = {
            let mut visits = self.visits.lock();
            match visits.remove(&visit_id) {
                Some(mut visit) => {
                    visit.end_at = Some(Utc::now());
                    visit
                }
                None => {
                    tracing::debug!(%visit_id, "mark_page_end for unknown or already-closed visit");
                    return;
                }
            }
        };

        let event = PageTimingEvent {
            id: uuid::Uuid::new_v4(),
            visit_id,
            load_duration_ms: visit.load_duration_ms(),
            appear_duration_ms: visit.appear_duration_ms(),
            total_duration_ms: visit.total_duration_ms(),
            visit,
        };

        if let Some(callback) = self.event_bus.page_timing().await {
            callback.on_page_timing_event(event).await;
        }
    }

    /// Number of visits currently in progress, for diagnostics/tests.
    pub fn open_visit_count(&self) -> usize {
        self.visits.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingPageTiming {
        count: Arc<AtomicUsize>,
        last: Mutex<Option<PageTimingEvent>>,
    }

    #[async_trait]
    impl debugprobe_kernel::PageTimingCallback for RecordingPageTiming {
        async fn on_page_timing_event(&self, event: PageTimingEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some(event);
        }
    }

    fn start(page_id: &str) -> PageVisitStart {
        PageVisitStart {
            page_id: page_id.to_string(),
            page_name: "Home".to_string(),
            route: Some("/home".to_string()),
            is_cold_start: false,
            is_push: Some(false),
            parent_page_id: None,
        }
    }

    #[tokio::test]
    async fn full_timeline_derives_all_durations() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let recorder_hook = Arc::new(RecordingPageTiming {
            count: count.clone(),
            last: Mutex::new(None),
        });
        bus.install_page_timing(recorder_hook.clone()).await;

        let recorder = TimingRecorder::new(bus);
        let visit_id = recorder.mark_page_start(start("p1"));
        recorder.mark_page_first_layout(visit_id);
        recorder.mark_page_appear(visit_id);
        recorder.add_marker(visit_id, "rendered", HashMap::new());
        recorder.mark_page_end(visit_id).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        let last = recorder_hook.last.lock().clone().unwrap();
        assert!(last.load_duration_ms.is_some());
        assert!(last.appear_duration_ms.is_some());
        assert!(last.total_duration_ms.is_some());
        assert_eq!(last.visit.markers.len(), 1);
        assert_eq!(recorder.open_visit_count(), 0);
    }

    #[tokio::test]
    async fn missing_timestamps_leave_derived_durations_absent() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let hook = Arc::new(RecordingPageTiming {
            count: count.clone(),
            last: Mutex::new(None),
        });
        bus.install_page_timing(hook.clone()).await;

        let recorder = TimingRecorder::new(bus);
        let visit_id = recorder.mark_page_start(start("p1"));
        recorder.mark_page_end(visit_id).await;

        let last = hook.last.lock().clone().unwrap();
        assert!(last.load_duration_ms.is_none());
        assert!(last.appear_duration_ms.is_none());
        assert!(last.total_duration_ms.is_some());
    }

    #[tokio::test]
    async fn calls_after_end_are_ignored() {
        let bus = Arc::new(EventBus::new());
        let recorder = TimingRecorder::new(bus);
        let visit_id = recorder.mark_page_start(start("p1"));
        recorder.mark_page_end(visit_id).await;

        // Late calls after close must not resurrect or mutate state.
        recorder.mark_page_first_layout(visit_id);
        recorder.add_marker(visit_id, "late", HashMap::new());
        assert_eq!(recorder.open_visit_count(), 0);

        // A second end for the same id is a harmless no-op.
        recorder.mark_page_end(visit_id).await;
    }

    #[tokio::test]
    async fn unrelated_visits_do_not_interfere() {
        let bus = Arc::new(EventBus::new());
        let recorder = TimingRecorder::new(bus);
        let a = recorder.mark_page_start(start("a"));
        let b = recorder.mark_page_start(start("b"));
        assert_eq!(recorder.open_visit_count(), 2);
        recorder.mark_page_end(a).await;
        assert_eq!(recorder.open_visit_count(), 1);
        recorder.mark_page_end(b).await;
        assert_eq!(recorder.open_visit_count(), 0);
    }
}
