//! Client-side workspace engine: resumes or seeds a control's editable
//! assessment, writes every edit through to local storage and reports
//! interaction events to the collector.

pub mod config;
mod controller;
mod page;
mod render;
mod reporting;
mod surface;

pub use controller::{
    discard_workspace, ActivationError, SurfaceEvent, WorkspaceController, WorkspacePhase,
};
pub use page::WorkspacePage;
pub use render::{LoggingRenderTrigger, RenderTrigger};
pub use reporting::{DisabledEventSink, EventSink, HttpEventSink};
pub use surface::{EditableSurface, MemorySurface};
