//! Supersampled rasterization of paint commands, plus image encoders

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tiny_skia::{FillRule, FilterQuality, IntSize, Paint, Pixmap, PixmapPaint, Transform};

use super::layout::TextAlign;
use super::paint::PaintCommand;
use super::resources::ResourceLoader;
use super::text::FontFace;
use crate::{Error, Result};

pub struct Rasterizer<'a> {
    factor: f32,
    background: [u8; 3],
    loader: &'a dyn ResourceLoader,
    font: Option<&'a FontFace>,
}

impl<'a> Rasterizer<'a> {
    pub fn new(factor: f32, background: [u8; 3], loader: &'a dyn ResourceLoader) -> Self {
        Self { factor, background, loader, font: None }
    }

    /// Draw text with `font`. Without a font, text commands are skipped.
    pub fn with_font(mut self, font: Option<&'a FontFace>) -> Self {
        self.font = font;
        self
    }

    /// Output size in pixels for a logical size.
    pub fn output_size(&self, width: f32, height: f32) -> (u32, u32) {
        ((width * self.factor).round() as u32, (height * self.factor).round() as u32)
    }

    /// Paint `commands` onto a background-filled pixmap of
    /// `width * factor` by `height * factor` pixels.
    ///
    /// Images that fail to load or decode are left blank.
    pub fn rasterize(&self, commands: &[PaintCommand], width: f32, height: f32) -> Result<Pixmap> {
        if !(self.factor.is_finite() && self.factor > 0.0) {
            return Err(Error::CaptureError(format!("invalid raster factor {}", self.factor)));
        }
        let (w, h) = self.output_size(width, height);
        let mut pixmap = Pixmap::new(w, h)
            .ok_or_else(|| Error::CaptureError(format!("Failed to create pixmap {}x{}", w, h)))?;
        let [r, g, b] = self.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

        let base = Transform::from_scale(self.factor, self.factor);
        for cmd in commands {
            match cmd {
                PaintCommand::SolidRect { x, y, width, height, rgba } => {
                    fill_rect(&mut pixmap, *x, *y, *width, *height, *rgba, base);
                }
                PaintCommand::Text { x, y, width, align, font_size, rgba, text } => match self.font {
                    Some(font) => paint_text(&mut pixmap, font, TextLine { x: *x, y: *y, width: *width, align: *align, font_size: *font_size, rgba: *rgba, text }, base),
                    None => log::debug!("no font, skipping text {:?}", text),
                },
                PaintCommand::Image { x, y, width, height, src } => {
                    if let Err(e) = self.paint_image(&mut pixmap, *x, *y, *width, *height, src, base) {
                        log::warn!("leaving image {} blank: {}", src, e);
                    }
                }
            }
        }
        Ok(pixmap)
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_image(
        &self,
        pixmap: &mut Pixmap,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        src: &str,
        base: Transform,
    ) -> Result<()> {
        let bytes = self.loader.load(src)?;
        let image = decode_to_pixmap(&bytes)?;
        let sx = width / image.width() as f32;
        let sy = height / image.height() as f32;
        if !sx.is_finite() || !sy.is_finite() {
            return Ok(());
        }
        let paint = PixmapPaint { quality: FilterQuality::Bilinear, ..PixmapPaint::default() };
        let transform = base.pre_concat(Transform::from_row(sx, 0.0, 0.0, sy, x, y));
        pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
        Ok(())
    }
}

fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, width: f32, height: f32, rgba: (u8, u8, u8, u8), transform: Transform) {
    let Some(rect) = tiny_skia::Rect::from_xywh(x, y, width, height) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba.0, rgba.1, rgba.2, rgba.3);
    paint.anti_alias = true;
    pixmap.fill_rect(rect, &paint, transform, None);
}

struct TextLine<'t> {
    x: f32,
    y: f32,
    width: f32,
    align: TextAlign,
    font_size: f32,
    rgba: (u8, u8, u8, u8),
    text: &'t str,
}

// Lines wider than their box are narrowed to fit instead of overflowing.
fn paint_text(pixmap: &mut Pixmap, font: &FontFace, line: TextLine<'_>, transform: Transform) {
    let Some(path) = font.line_path(line.text, line.font_size) else {
        return;
    };
    let advance = font.measure(line.text, line.font_size);
    let squeeze = if advance > line.width && advance > 0.0 { line.width / advance } else { 1.0 };
    let drawn = advance * squeeze;
    let x = match line.align {
        TextAlign::Left => line.x,
        TextAlign::Center => line.x + (line.width - drawn) / 2.0,
        TextAlign::Right => line.x + line.width - drawn,
    };
    let baseline = line.y + font.baseline_offset(line.font_size);

    let mut paint = Paint::default();
    let (r, g, b, a) = line.rgba;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    let placed = transform.pre_concat(Transform::from_row(squeeze, 0.0, 0.0, 1.0, x, baseline));
    pixmap.fill_path(&path, &paint, FillRule::Winding, placed, None);
}

/// Decode PNG/JPEG bytes into a premultiplied pixmap.
pub fn decode_to_pixmap(bytes: &[u8]) -> Result<Pixmap> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| Error::ResourceError(format!("image decode failed: {}", e)))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| Error::ResourceError("image has no pixels".into()))?;

    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        data.push(((r as u16 * alpha + 127) / 255) as u8);
        data.push(((g as u16 * alpha + 127) / 255) as u8);
        data.push(((b as u16 * alpha + 127) / 255) as u8);
        data.push(a);
    }
    Pixmap::from_vec(data, size).ok_or_else(|| Error::ResourceError("invalid image buffer".into()))
}

/// Flatten onto `background` and encode as baseline JPEG.
pub fn encode_jpeg(pixmap: &Pixmap, quality: u8, background: [u8; 3]) -> Result<Vec<u8>> {
    let mut rgb = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for p in pixmap.pixels() {
        let inv = 255 - p.alpha() as u16;
        // premultiplied source over opaque background
        rgb.push((p.red() as u16 + (background[0] as u16 * inv + 127) / 255).min(255) as u8);
        rgb.push((p.green() as u16 + (background[1] as u16 * inv + 127) / 255).min(255) as u8);
        rgb.push((p.blue() as u16 + (background[2] as u16 * inv + 127) / 255).min(255) as u8);
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .write_image(&rgb, pixmap.width(), pixmap.height(), ExtendedColorType::Rgb8)
        .map_err(|e| Error::CaptureError(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}

pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
    pixmap
        .encode_png()
        .map_err(|e| Error::CaptureError(format!("PNG encode failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoImages;

    impl ResourceLoader for NoImages {
        fn load(&self, src: &str) -> Result<Vec<u8>> {
            Err(Error::ResourceError(format!("blocked {}", src)))
        }
    }

    fn pixel(p: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let c = p.pixel(x, y).unwrap();
        (c.red(), c.green(), c.blue(), c.alpha())
    }

    #[test]
    fn rasterize_scales_output_and_fills_background() {
        let r = Rasterizer::new(2.0, [255, 255, 255], &NoImages);
        let cmds = vec![PaintCommand::SolidRect { x: 0.0, y: 0.0, width: 5.0, height: 5.0, rgba: (255, 0, 0, 255) }];
        let p = r.rasterize(&cmds, 20.0, 10.0).unwrap();
        assert_eq!((p.width(), p.height()), (40, 20));
        assert_eq!(pixel(&p, 2, 2), (255, 0, 0, 255));
        // 5 logical units -> 10 pixels
        assert_eq!(pixel(&p, 12, 2), (255, 255, 255, 255));
        assert_eq!(pixel(&p, 39, 19), (255, 255, 255, 255));
    }

    #[test]
    fn failing_images_render_blank() {
        let r = Rasterizer::new(1.0, [255, 255, 255], &NoImages);
        let cmds = vec![PaintCommand::Image { x: 0.0, y: 0.0, width: 8.0, height: 8.0, src: "https://x/y.png".into() }];
        let p = r.rasterize(&cmds, 8.0, 8.0).unwrap();
        assert_eq!(pixel(&p, 4, 4), (255, 255, 255, 255));
    }

    fn text(x: f32, width: f32, align: TextAlign, text: &str) -> PaintCommand {
        PaintCommand::Text { x, y: 0.0, width, align, font_size: 20.0, rgba: (0, 0, 0, 255), text: text.into() }
    }

    // Horizontal extent of non-white pixels.
    fn ink_columns(p: &Pixmap) -> Option<(u32, u32)> {
        let mut cols = (0..p.width()).filter(|&x| (0..p.height()).any(|y| pixel(p, x, y).0 < 128));
        let first = cols.next()?;
        Some((first, cols.last().unwrap_or(first)))
    }

    fn font() -> FontFace {
        FontFace::system_default().expect("a system font is installed")
    }

    #[test]
    fn text_is_drawn_from_glyph_outlines() {
        let font = font();
        let r = Rasterizer::new(1.0, [255, 255, 255], &NoImages).with_font(Some(&font));
        let a = r.rasterize(&[text(0.0, 200.0, TextAlign::Left, "Jane")], 200.0, 30.0).unwrap();
        let b = r.rasterize(&[text(0.0, 200.0, TextAlign::Left, "Ravi")], 200.0, 30.0).unwrap();
        assert!(ink_columns(&a).is_some());
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn text_without_font_is_skipped() {
        let r = Rasterizer::new(1.0, [255, 255, 255], &NoImages);
        let p = r.rasterize(&[text(0.0, 200.0, TextAlign::Left, "Jane")], 200.0, 30.0).unwrap();
        assert!(ink_columns(&p).is_none());
    }

    #[test]
    fn centered_text_is_balanced_in_its_box() {
        let font = font();
        let r = Rasterizer::new(1.0, [255, 255, 255], &NoImages).with_font(Some(&font));
        let p = r.rasterize(&[text(0.0, 300.0, TextAlign::Center, "HH")], 300.0, 30.0).unwrap();
        let (left, right) = ink_columns(&p).unwrap();
        assert!((left as i32 - (299 - right as i32)).abs() <= 3, "{}..{}", left, right);
    }

    #[test]
    fn overlong_line_is_narrowed_into_its_box() {
        let font = font();
        let r = Rasterizer::new(1.0, [255, 255, 255], &NoImages).with_font(Some(&font));
        let p = r.rasterize(&[text(10.0, 40.0, TextAlign::Left, "MMMMMMMMMM")], 100.0, 30.0).unwrap();
        let (left, right) = ink_columns(&p).unwrap();
        assert!(left >= 9 && right <= 51, "{}..{}", left, right);
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let r = Rasterizer::new(1.0, [255, 255, 255], &NoImages);
        let p = r.rasterize(&[], 16.0, 16.0).unwrap();
        let jpeg = encode_jpeg(&p, 90, [255, 255, 255]).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        let png = encode_png(&p).unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn transparent_pixels_flatten_to_background() {
        let transparent = Pixmap::new(4, 4).unwrap();
        let jpeg = encode_jpeg(&transparent, 90, [255, 255, 255]).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let px = decoded.get_pixel(1, 1).0;
        assert!(px.iter().all(|c| *c > 245), "{:?}", px);
    }
}
