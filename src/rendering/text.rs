//! Font lookup and glyph outlines for certificate text
//!
//! One face is used for all text. It comes from an explicit font file when
//! one is configured, otherwise from the system font database. Lines are
//! turned into a single tiny-skia path with the baseline at `y = 0`.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use fontdb::{Database, Family, Query};
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::{FontRef, GlyphId, MetadataProvider};
use tiny_skia::PathBuilder;

use super::layout::LINE_HEIGHT_EM;
use crate::{Error, Result};

// Tried in order before falling back to whatever face the system has.
const PREFERRED_FAMILIES: &[&str] = &["DejaVu Sans", "Noto Sans", "Liberation Sans", "Arial", "Helvetica"];

static SYSTEM_FACE: OnceLock<Option<FontFace>> = OnceLock::new();

/// A loaded font face, cheap to clone.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    index: u32,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace").field("bytes", &self.data.len()).field("index", &self.index).finish()
    }
}

impl FontFace {
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self> {
        FontRef::from_index(&data, index)
            .map_err(|e| Error::ResourceError(format!("unusable font data: {}", e)))?;
        Ok(Self { data: Arc::new(data), index })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::ResourceError(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(data, 0)
    }

    /// A sans-serif face from the system font database, loaded once per process.
    pub fn system_default() -> Option<FontFace> {
        SYSTEM_FACE.get_or_init(load_system_face).clone()
    }

    /// The configured font file if it loads, otherwise the system default.
    pub fn resolve(path: Option<&Path>) -> Option<FontFace> {
        if let Some(path) = path {
            match Self::from_file(path) {
                Ok(face) => return Some(face),
                Err(e) => log::warn!("falling back to a system font: {}", e),
            }
        }
        let face = Self::system_default();
        if face.is_none() {
            log::warn!("no usable font found; certificate text will not be drawn");
        }
        face
    }

    fn font_ref(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, self.index).ok()
    }

    /// Advance width of `text` at `font_size`.
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        let Some(font) = self.font_ref() else {
            return 0.0;
        };
        let charmap = font.charmap();
        let metrics = font.glyph_metrics(Size::new(font_size), LocationRef::default());
        text.chars()
            .map(|c| metrics.advance_width(charmap.map(c).unwrap_or(GlyphId::NOTDEF)).unwrap_or(0.0))
            .sum()
    }

    /// Distance from the top of a line box to the baseline, with the glyph
    /// extent centred in the box.
    pub fn baseline_offset(&self, font_size: f32) -> f32 {
        let Some(font) = self.font_ref() else {
            return font_size;
        };
        let m = font.metrics(Size::new(font_size), LocationRef::default());
        let extent = m.ascent - m.descent;
        (font_size * LINE_HEIGHT_EM - extent) / 2.0 + m.ascent
    }

    /// Outline of one line of text, origin at the start of the baseline, y down.
    ///
    /// `None` when nothing in the line has ink (empty or only spaces).
    pub fn line_path(&self, text: &str, font_size: f32) -> Option<tiny_skia::Path> {
        let font = self.font_ref()?;
        let size = Size::new(font_size);
        let charmap = font.charmap();
        let metrics = font.glyph_metrics(size, LocationRef::default());
        let outlines = font.outline_glyphs();

        let mut pen = LinePen { builder: PathBuilder::new(), dx: 0.0 };
        for c in text.chars() {
            let gid = charmap.map(c).unwrap_or(GlyphId::NOTDEF);
            if let Some(glyph) = outlines.get(gid) {
                if let Err(e) = glyph.draw(DrawSettings::unhinted(size, LocationRef::default()), &mut pen) {
                    log::debug!("skipping glyph for {:?}: {}", c, e);
                }
            }
            pen.dx += metrics.advance_width(gid).unwrap_or(0.0);
        }
        pen.builder.finish()
    }
}

fn load_system_face() -> Option<FontFace> {
    let mut db = Database::new();
    db.load_system_fonts();

    let families: Vec<Family<'_>> = PREFERRED_FAMILIES
        .iter()
        .map(|name| Family::Name(*name))
        .chain(std::iter::once(Family::SansSerif))
        .collect();
    let id = db
        .query(&Query { families: &families, ..Query::default() })
        .or_else(|| db.faces().next().map(|face| face.id))?;

    let face = db.with_face_data(id, |data, index| FontFace::from_bytes(data.to_vec(), index))?;
    match face {
        Ok(face) => {
            log::debug!("using system font {:?}", db.face(id).map(|f| f.post_script_name.clone()));
            Some(face)
        }
        Err(e) => {
            log::warn!("system font rejected: {}", e);
            None
        }
    }
}

// Font outlines are y-up; the pixmap is y-down.
struct LinePen {
    builder: PathBuilder,
    dx: f32,
}

impl OutlinePen for LinePen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(x + self.dx, -y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(x + self.dx, -y);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.builder.quad_to(cx0 + self.dx, -cy0, x + self.dx, -y);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.builder.cubic_to(cx0 + self.dx, -cy0, cx1 + self.dx, -cy1, x + self.dx, -y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
