//! Renderable surfaces: a mounted certificate document resolved by element id
//!
//! The layout layer owns the markup and replaces it whenever the user's data
//! changes; the capture path only ever reads it, resolving its handle at call
//! time the way `getElementById` would.

use std::sync::{PoisonError, RwLock};

use scraper::{Html, Selector};

use super::layout::{layout_subtree, LayoutNode};
use crate::{Error, Result, LOGICAL_HEIGHT, LOGICAL_WIDTH};

/// Id of the hidden, full-resolution certificate used for capture.
pub const CAPTURE_TARGET_ID: &str = "pledge-poster-capture";
/// Id of the on-screen certificate shown on the success screen.
pub const PREVIEW_TARGET_ID: &str = "preview-poster";

/// Stable identifier of a renderable subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(String);

impl SurfaceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn capture_target() -> Self {
        Self::new(CAPTURE_TARGET_ID)
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// A resolved, laid-out subtree at its full logical size.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub handle: SurfaceHandle,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<LayoutNode>,
}

/// Holds the currently mounted certificate document.
#[derive(Debug, Default)]
pub struct SurfaceHost {
    markup: RwLock<Option<String>>,
}

impl SurfaceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mounted document.
    pub fn mount(&self, markup: impl Into<String>) {
        let mut g = self.markup.write().unwrap_or_else(PoisonError::into_inner);
        *g = Some(markup.into());
    }

    pub fn unmount(&self) {
        let mut g = self.markup.write().unwrap_or_else(PoisonError::into_inner);
        *g = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.markup.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Find the element with `handle`'s id and lay it out.
    ///
    /// Fails with [`Error::ElementNotFound`] when nothing is mounted or no
    /// element carries that id.
    pub fn resolve(&self, handle: &SurfaceHandle) -> Result<Surface> {
        let markup = self
            .markup
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::ElementNotFound(handle.id().to_string()))?;

        let document = Html::parse_document(&markup);
        let with_id = Selector::parse("[id]")
            .map_err(|e| Error::Other(format!("invalid selector: {:?}", e)))?;
        let element = document
            .select(&with_id)
            .find(|el| el.value().id() == Some(handle.id()))
            .ok_or_else(|| Error::ElementNotFound(handle.id().to_string()))?;

        let (width, height, nodes) =
            layout_subtree(element, (LOGICAL_WIDTH as f32, LOGICAL_HEIGHT as f32))?;
        log::debug!("resolved surface #{} ({}x{}, {} nodes)", handle.id(), width, height, nodes.len());
        Ok(Surface { handle: handle.clone(), width, height, nodes })
    }
}
