use std::sync::Arc;

use serde_json::Value;
use shared::domain::{ControlId, WorkspaceRecord, WorkspaceStatus};
use storage::WorkspaceStore;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{render::RenderTrigger, surface::EditableSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePhase {
    Uninitialized,
    Pristine,
    InProgress,
}

impl From<WorkspaceStatus> for WorkspacePhase {
    fn from(status: WorkspaceStatus) -> Self {
        match status {
            WorkspaceStatus::Pristine => WorkspacePhase::Pristine,
            WorkspaceStatus::InProgress => WorkspacePhase::InProgress,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error("surface for control {control_id} holds no rendered content; the host must seed it before activation")]
    SurfaceNotSeeded { control_id: ControlId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Activate,
    Input,
    Reset,
}

/// Binds one editable surface to the persisted record of one control.
pub struct WorkspaceController<S: EditableSurface> {
    control_id: ControlId,
    surface: S,
    store: WorkspaceStore,
    render: Arc<dyn RenderTrigger>,
    record: Option<WorkspaceRecord>,
    last_persist_error: Option<String>,
}

impl<S: EditableSurface> WorkspaceController<S> {
    pub fn new(
        control_id: ControlId,
        surface: S,
        store: WorkspaceStore,
        render: Arc<dyn RenderTrigger>,
    ) -> Self {
        Self {
            control_id,
            surface,
            store,
            render,
            record: None,
            last_persist_error: None,
        }
    }

    pub fn control_id(&self) -> &ControlId {
        &self.control_id
    }

    pub fn phase(&self) -> WorkspacePhase {
        self.record
            .as_ref()
            .map_or(WorkspacePhase::Uninitialized, |record| record.status().into())
    }

    pub fn record(&self) -> Option<&WorkspaceRecord> {
        self.record.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub async fn activate(&mut self) -> Result<WorkspacePhase, ActivationError> {
        let (resumed, from_memory) = match self.store.read(&self.control_id).await {
            Some(record) => (Some(record), false),
            // Only a copy whose last write failed is rewritten; an absent
            // record otherwise means it was discarded and must be reseeded.
            None if self.last_persist_error.is_some() => (self.record.take(), true),
            None => (None, false),
        };

        match resumed {
            Some(record) => {
                self.surface.set_inner_html(record.workspace_html());
                self.record = Some(record);
                if from_memory {
                    self.commit().await;
                }
                info!(
                    control_id = %self.control_id,
                    phase = ?self.phase(),
                    "resumed workspace"
                );
            }
            None => {
                let seed = self.surface.inner_html();
                if seed.trim().is_empty() {
                    return Err(ActivationError::SurfaceNotSeeded {
                        control_id: self.control_id.clone(),
                    });
                }
                self.record = Some(WorkspaceRecord::seeded(self.control_id.clone(), seed));
                self.commit().await;
                info!(control_id = %self.control_id, "seeded workspace from rendered content");
            }
        }

        self.surface.set_editable(true);
        Ok(self.phase())
    }

    /// Returns `false` when the controller is inactive.
    pub async fn handle_input(&mut self) -> bool {
        let html = self.surface.inner_html();
        let Some(record) = self.record.as_mut() else {
            debug!(control_id = %self.control_id, "ignoring input for inactive workspace");
            return false;
        };
        record.apply_edit(html);
        self.commit().await;
        true
    }

    pub async fn reset(&mut self) {
        self.record = None;
        self.last_persist_error = None;
        discard_workspace(&self.store, self.render.as_ref(), &self.control_id).await;
    }

    pub async fn record_quality_check(&mut self, quality_check: Value) -> bool {
        let Some(record) = self.record.as_mut() else {
            return false;
        };
        record.record_quality_check(quality_check);
        self.commit().await;
        true
    }

    pub async fn append_refinement(&mut self, refinement: Value) -> bool {
        let Some(record) = self.record.as_mut() else {
            return false;
        };
        record.append_refinement(refinement);
        self.commit().await;
        true
    }

    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SurfaceEvent>) -> Self {
        while let Some(event) = events.recv().await {
            match event {
                SurfaceEvent::Activate => {
                    if let Err(error) = self.activate().await {
                        warn!(control_id = %self.control_id, %error, "workspace activation failed");
                    }
                }
                SurfaceEvent::Input => {
                    self.handle_input().await;
                }
                SurfaceEvent::Reset => self.reset().await,
            }
        }
        self
    }

    async fn commit(&mut self) {
        let Some(record) = self.record.as_mut() else {
            return;
        };
        match self.store.write(record).await {
            Ok(()) => self.last_persist_error = None,
            Err(error) => {
                warn!(
                    control_id = %self.control_id,
                    error = %format!("{error:#}"),
                    "workspace not persisted; keeping in-memory state"
                );
                self.last_persist_error = Some(format!("{error:#}"));
            }
        }
    }
}

// A failed delete still signals the re-render.
pub async fn discard_workspace(
    store: &WorkspaceStore,
    render: &dyn RenderTrigger,
    control_id: &ControlId,
) {
    if let Err(error) = store.delete(control_id).await {
        warn!(%control_id, error = %format!("{error:#}"), "failed to delete stored workspace");
    }
    info!(%control_id, "workspace reset");
    render.request_rerender(control_id);
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
