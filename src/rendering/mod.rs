//! Certificate rendering: markup, layout, display list and rasterization

pub mod layout;
pub mod paint;
pub mod raster;
pub mod resources;
pub mod surface;
pub mod template;
pub mod text;

pub use layout::{ElementType, LayoutNode, Rect, TextAlign};
pub use paint::{build_display_list, PaintCommand};
pub use raster::{encode_jpeg, encode_png, Rasterizer};
pub use resources::{DefaultLoader, ResourceLoader};
pub use text::FontFace;
pub use surface::{Surface, SurfaceHandle, SurfaceHost, CAPTURE_TARGET_ID, PREVIEW_TARGET_ID};

use crate::Result;
use tiny_skia::Pixmap;

/// Rasterize a resolved surface at `factor` times its logical size.
///
/// Both the capture path and preview thumbnails go through here, so a given
/// surface and factor always produce the same pixels.
pub fn render_surface(
    surface: &Surface,
    factor: f32,
    background: [u8; 3],
    loader: &dyn ResourceLoader,
    font: Option<&FontFace>,
) -> Result<Pixmap> {
    let commands = build_display_list(surface);
    Rasterizer::new(factor, background, loader)
        .with_font(font)
        .rasterize(&commands, surface.width, surface.height)
}
