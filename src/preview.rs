//! On-screen preview of the certificate
//!
//! The preview keeps the certificate at its full logical size and only
//! describes a visual `scale(..)` transform anchored at the top-left corner,
//! so the scaled box exactly fills the observed container. The surface is
//! borrowed read-only; a capture of the same surface is unaffected by
//! whatever scale is on screen.

use tiny_skia::Pixmap;

use crate::rendering::{self, build_display_list, FontFace, PaintCommand, ResourceLoader, Surface};
use crate::{Result, LOGICAL_HEIGHT, LOGICAL_WIDTH};

/// Geometry of the scaled preview box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewFrame {
    pub scale: f64,
    /// Logical size of the inner certificate (never scaled)
    pub logical_width: u32,
    pub logical_height: u32,
}

impl PreviewFrame {
    pub fn new(scale: f64) -> Self {
        Self { scale, logical_width: LOGICAL_WIDTH, logical_height: LOGICAL_HEIGHT }
    }

    /// On-screen size of the scaled box.
    pub fn displayed_size(&self) -> (f64, f64) {
        (self.logical_width as f64 * self.scale, self.logical_height as f64 * self.scale)
    }

    /// Map a logical point to on-screen coordinates (origin top-left).
    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale, y * self.scale)
    }

    pub fn css_transform(&self) -> String {
        format!("scale({})", self.scale)
    }

    pub fn css_transform_origin(&self) -> &'static str {
        "top left"
    }
}

/// A composed preview: the unscaled display list plus the transform to show it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub frame: PreviewFrame,
    pub commands: Vec<PaintCommand>,
}

#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    font: Option<FontFace>,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self { font: FontFace::system_default() }
    }

    pub fn with_font(font: Option<FontFace>) -> Self {
        Self { font }
    }

    pub fn compose(&self, surface: &Surface, scale: f64) -> Preview {
        Preview { frame: PreviewFrame::new(scale), commands: build_display_list(surface) }
    }

    /// Rasterize a thumbnail of `surface` at the preview scale.
    pub fn thumbnail(&self, surface: &Surface, scale: f64, loader: &dyn ResourceLoader) -> Result<Pixmap> {
        rendering::render_surface(surface, scale as f32, [255, 255, 255], loader, self.font.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::scale_for_width;

    #[test]
    fn scaled_box_fills_the_container() {
        let frame = PreviewFrame::new(scale_for_width(384.0));
        let (w, h) = frame.displayed_size();
        assert!((w - 384.0).abs() < 1e-9);
        assert!((h - 512.0).abs() < 1e-9);
        assert_eq!(frame.to_screen(0.0, 0.0), (0.0, 0.0));
        assert_eq!(frame.css_transform_origin(), "top left");
    }

    #[test]
    fn css_transform_reflects_scale() {
        assert_eq!(PreviewFrame::new(0.5).css_transform(), "scale(0.5)");
    }
}
