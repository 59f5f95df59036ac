use std::sync::{Arc, PoisonError, RwLock};

/// The editable element a workspace is rendered into.
pub trait EditableSurface: Send {
    fn inner_html(&self) -> String;
    fn set_inner_html(&mut self, html: &str);
    fn set_editable(&mut self, editable: bool);
}

#[derive(Debug, Default)]
struct SurfaceState {
    html: String,
    editable: bool,
}

/// Clones share the same content.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Arc<RwLock<SurfaceState>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(html: impl Into<String>) -> Self {
        let surface = Self::default();
        surface
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .html = html.into();
        surface
    }

    pub fn is_editable(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .editable
    }

    pub fn replace_html(&self, html: impl Into<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .html = html.into();
    }
}

impl EditableSurface for MemorySurface {
    fn inner_html(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .html
            .clone()
    }

    fn set_inner_html(&mut self, html: &str) {
        self.replace_html(html);
    }

    fn set_editable(&mut self, editable: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .editable = editable;
    }
}
