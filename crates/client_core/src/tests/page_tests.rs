use super::*;
use std::sync::Mutex;

use serde_json::json;
use shared::domain::{WorkspaceRecord, WorkspaceStatus};
use tokio::sync::mpsc;

use crate::surface::MemorySurface;

#[derive(Default)]
struct RecordingEventSink {
    events: Mutex<Vec<TrackEvent>>,
}

impl RecordingEventSink {
    fn recorded(&self) -> Vec<TrackEvent> {
        self.events.lock().expect("events lock").clone()
    }
}

impl EventSink for RecordingEventSink {
    fn report(&self, event: TrackEvent) {
        self.events.lock().expect("events lock").push(event);
    }
}

struct Harness {
    page: WorkspacePage<MemorySurface>,
    surface: MemorySurface,
    store: WorkspaceStore,
    events: Arc<RecordingEventSink>,
    render_rx: mpsc::UnboundedReceiver<ControlId>,
}

fn harness(initial_html: &str) -> Harness {
    let surface = MemorySurface::with_html(initial_html);
    let store = WorkspaceStore::in_memory();
    let events = Arc::new(RecordingEventSink::default());
    let (render_tx, render_rx) = mpsc::unbounded_channel();
    let page = WorkspacePage::new(
        surface.clone(),
        store.clone(),
        Arc::new(render_tx),
        events.clone(),
    );
    Harness {
        page,
        surface,
        store,
        events,
        render_rx,
    }
}

#[tokio::test]
async fn input_without_initialized_workspace_is_ignored() {
    let mut h = harness("<p>draft</p>");
    assert!(!h.page.handle_input().await);
    assert!(h.page.controller().is_none());
}

#[tokio::test]
async fn initialize_then_edit_then_reset_through_page_api() {
    let mut h = harness("<p>draft</p>");
    let control = ControlId::from("control-42");

    let phase = h
        .page
        .initialize_workspace(control.clone())
        .await
        .expect("initialize");
    assert_eq!(phase, WorkspacePhase::Pristine);

    h.surface.replace_html("<p>draft v2</p>");
    assert!(h.page.handle_input().await);
    let stored = h.store.read(&control).await.expect("record");
    assert_eq!(stored.status(), WorkspaceStatus::InProgress);
    assert_eq!(stored.workspace_html(), "<p>draft v2</p>");

    h.page.reset_workspace(&control).await;
    assert!(h.store.read(&control).await.is_none());
    assert_eq!(h.render_rx.try_recv().expect("re-render"), control);
    assert_eq!(
        h.page.controller().expect("bound").phase(),
        WorkspacePhase::Uninitialized
    );
}

#[tokio::test]
async fn initializing_another_control_rebinds_the_surface() {
    let mut h = harness("<p>control a</p>");
    let control_a = ControlId::from("AC-1");
    let control_b = ControlId::from("AC-2");

    h.page
        .initialize_workspace(control_a.clone())
        .await
        .expect("a");
    h.surface.replace_html("<p>control b</p>");
    h.page
        .initialize_workspace(control_b.clone())
        .await
        .expect("b");

    h.surface.replace_html("<p>control b edited</p>");
    h.page.handle_input().await;

    let a = h.store.read(&control_a).await.expect("a record");
    let b = h.store.read(&control_b).await.expect("b record");
    assert_eq!(a.status(), WorkspaceStatus::Pristine);
    assert_eq!(a.workspace_html(), "<p>control a</p>");
    assert_eq!(b.workspace_html(), "<p>control b edited</p>");
    assert_eq!(b.initial_generation_html(), "<p>control b</p>");
    assert_eq!(h.page.controller().expect("bound").control_id(), &control_b);
}

#[tokio::test]
async fn reset_of_unbound_control_deletes_its_record_only() {
    let mut h = harness("<p>draft</p>");
    let bound = ControlId::from("AC-1");
    let other = ControlId::from("AC-9");
    let mut other_record = WorkspaceRecord::seeded(other.clone(), "<p>other</p>");
    h.store.write(&mut other_record).await.expect("seed other");
    h.page
        .initialize_workspace(bound.clone())
        .await
        .expect("initialize");

    h.page.reset_workspace(&other).await;

    assert!(h.store.read(&other).await.is_none());
    assert!(h.store.read(&bound).await.is_some());
    assert_eq!(h.render_rx.try_recv().expect("re-render"), other);
    assert_eq!(
        h.page.controller().expect("bound").phase(),
        WorkspacePhase::Pristine
    );
}

#[tokio::test]
async fn tracked_events_leave_workspace_untouched() {
    let mut h = harness("<p>draft</p>");
    let control = ControlId::from("control-42");
    h.page
        .initialize_workspace(control.clone())
        .await
        .expect("initialize");
    let before = h.store.read(&control).await.expect("record");

    let mut details = Map::new();
    details.insert("refinementId".into(), json!("r1"));
    h.page
        .track_event("refinement_applied", control.clone(), details);

    let after = h.store.read(&control).await.expect("record");
    assert_eq!(before, after);
    let events = h.events.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "refinement_applied");
    assert_eq!(events[0].details["refinementId"], "r1");
}

#[tokio::test]
async fn applied_refinement_is_recorded_and_reported() {
    let mut h = harness("<p>draft</p>");
    let control = ControlId::from("control-42");
    h.page
        .initialize_workspace(control.clone())
        .await
        .expect("initialize");

    h.page
        .refinement_applied(control.clone(), "r1", json!({ "id": "r1", "text": "tighten scope" }))
        .await;

    let stored = h.store.read(&control).await.expect("record");
    assert_eq!(stored.last_refinements().len(), 1);
    assert_eq!(stored.status(), WorkspaceStatus::Pristine);
    let events = h.events.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, REFINEMENT_APPLIED);
    assert_eq!(events[0].control_id, control);
    assert_eq!(events[0].details["refinementId"], "r1");
}
