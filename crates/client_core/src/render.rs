use shared::domain::ControlId;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Asks the host to reload a control's server-rendered content.
pub trait RenderTrigger: Send + Sync {
    fn request_rerender(&self, control_id: &ControlId);
}

impl RenderTrigger for mpsc::UnboundedSender<ControlId> {
    fn request_rerender(&self, control_id: &ControlId) {
        if self.send(control_id.clone()).is_err() {
            warn!(%control_id, "re-render receiver dropped; signal lost");
        }
    }
}

pub struct LoggingRenderTrigger;

impl RenderTrigger for LoggingRenderTrigger {
    fn request_rerender(&self, control_id: &ControlId) {
        info!(%control_id, "re-render requested");
    }
}
