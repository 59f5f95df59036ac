use std::sync::Arc;

use serde_json::{Map, Value};
use shared::{
    domain::ControlId,
    protocol::{TrackEvent, REFINEMENT_APPLIED},
};
use storage::WorkspaceStore;
use tracing::debug;

use crate::{
    controller::{discard_workspace, ActivationError, WorkspaceController, WorkspacePhase},
    render::RenderTrigger,
    reporting::EventSink,
    surface::EditableSurface,
};

/// Entry points a host page calls into, constructed once per page view.
pub struct WorkspacePage<S: EditableSurface + Clone> {
    surface: S,
    store: WorkspaceStore,
    render: Arc<dyn RenderTrigger>,
    events: Arc<dyn EventSink>,
    controller: Option<WorkspaceController<S>>,
}

impl<S: EditableSurface + Clone> WorkspacePage<S> {
    pub fn new(
        surface: S,
        store: WorkspaceStore,
        render: Arc<dyn RenderTrigger>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            surface,
            store,
            render,
            events,
            controller: None,
        }
    }

    pub fn controller(&self) -> Option<&WorkspaceController<S>> {
        self.controller.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub async fn initialize_workspace(
        &mut self,
        control_id: ControlId,
    ) -> Result<WorkspacePhase, ActivationError> {
        self.bind(control_id).activate().await
    }

    pub async fn handle_input(&mut self) -> bool {
        match self.controller.as_mut() {
            Some(controller) => controller.handle_input().await,
            None => false,
        }
    }

    // Also works for controls not bound to the surface.
    pub async fn reset_workspace(&mut self, control_id: &ControlId) {
        match self.controller.as_mut() {
            Some(controller) if controller.control_id() == control_id => controller.reset().await,
            _ => discard_workspace(&self.store, self.render.as_ref(), control_id).await,
        }
    }

    pub fn track_event(
        &self,
        event_type: impl Into<String>,
        control_id: ControlId,
        details: Map<String, Value>,
    ) {
        self.events
            .report(TrackEvent::new(event_type, control_id, details));
    }

    pub async fn refinement_applied(
        &mut self,
        control_id: ControlId,
        refinement_id: &str,
        refinement: Value,
    ) {
        match self.controller.as_mut() {
            Some(controller) if controller.control_id() == &control_id => {
                controller.append_refinement(refinement).await;
            }
            _ => debug!(%control_id, "refinement applied outside the bound workspace"),
        }
        let event = TrackEvent::new(REFINEMENT_APPLIED, control_id, Map::new())
            .with_detail("refinementId", refinement_id);
        self.events.report(event);
    }

    fn bind(&mut self, control_id: ControlId) -> &mut WorkspaceController<S> {
        if self
            .controller
            .as_ref()
            .is_some_and(|controller| controller.control_id() != &control_id)
        {
            self.controller = None;
        }

        let (surface, store, render) = (&self.surface, &self.store, &self.render);
        self.controller.get_or_insert_with(|| {
            WorkspaceController::new(control_id, surface.clone(), store.clone(), render.clone())
        })
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
