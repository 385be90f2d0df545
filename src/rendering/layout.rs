//! Absolute-position layout for certificate markup
//!
//! Elements are placed with `data-x`/`data-y` offsets relative to their
//! parent and sized with `data-w`/`data-h`. Text boxes wrap on an estimated
//! glyph advance of `CHAR_WIDTH_EM * font_size`; the rasterizer narrows any
//! line whose measured advance still overflows its box.

use scraper::ElementRef;

use crate::{Error, Result};

pub const DEFAULT_FONT_SIZE: f32 = 32.0;
pub const CHAR_WIDTH_EM: f32 = 0.6;
pub const LINE_HEIGHT_EM: f32 = 1.3;

const TEXT_TAGS: &[&str] = &["h1", "h2", "h3", "p", "span", "strong", "em"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Block,
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A laid-out element in logical units.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub rect: Rect,
    pub elem_type: ElementType,
    pub background: Option<(u8, u8, u8, u8)>,
    /// Wrapped lines joined with `\n` (text nodes only)
    pub text: String,
    pub color: (u8, u8, u8, u8),
    pub font_size: f32,
    pub align: TextAlign,
    /// Image source (image nodes only)
    pub src: Option<String>,
}

impl LayoutNode {
    fn new(rect: Rect, elem_type: ElementType) -> Self {
        Self {
            rect,
            elem_type,
            background: None,
            text: String::new(),
            color: (0, 0, 0, 255),
            font_size: DEFAULT_FONT_SIZE,
            align: TextAlign::Left,
            src: None,
        }
    }

    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_EM
    }
}

/// Lay out `root` and its descendants. Returns the root size and the nodes
/// in paint order (parents before children).
pub fn layout_subtree(root: ElementRef, default_size: (f32, f32)) -> Result<(f32, f32, Vec<LayoutNode>)> {
    let width = attr_f32(root, "data-w").unwrap_or(default_size.0);
    let height = attr_f32(root, "data-h").unwrap_or(default_size.1);
    if !(width > 0.0 && height > 0.0) {
        return Err(Error::CaptureError(format!("surface has no area ({}x{})", width, height)));
    }

    let mut nodes = Vec::new();
    let bounds = Rect { x: 0.0, y: 0.0, width, height };
    if let Some(bg) = root.value().attr("data-bg").and_then(parse_color) {
        let mut node = LayoutNode::new(bounds, ElementType::Block);
        node.background = Some(bg);
        nodes.push(node);
    }
    for child in root.children().filter_map(ElementRef::wrap) {
        layout_element(child, bounds, &mut nodes);
    }
    Ok((width, height, nodes))
}

fn layout_element(el: ElementRef, parent: Rect, nodes: &mut Vec<LayoutNode>) {
    let x = parent.x + attr_f32(el, "data-x").unwrap_or(0.0);
    let y = parent.y + attr_f32(el, "data-y").unwrap_or(0.0);
    let width = attr_f32(el, "data-w").unwrap_or((parent.x + parent.width - x).max(0.0));
    let background = el.value().attr("data-bg").and_then(parse_color);
    let name = el.value().name();

    if name == "img" {
        let height = attr_f32(el, "data-h").unwrap_or(width);
        if let Some(src) = el.value().attr("src").filter(|s| !s.trim().is_empty()) {
            let mut node = LayoutNode::new(Rect { x, y, width, height }, ElementType::Image);
            node.src = Some(src.trim().to_string());
            nodes.push(node);
        }
        return;
    }

    if TEXT_TAGS.contains(&name) {
        let font_size = attr_f32(el, "data-size").unwrap_or(DEFAULT_FONT_SIZE);
        let raw = el.text().collect::<String>();
        let lines = wrap_text(&raw, width, font_size);
        let natural = lines.len().max(1) as f32 * font_size * LINE_HEIGHT_EM;
        let height = attr_f32(el, "data-h").unwrap_or(natural);

        let mut node = LayoutNode::new(Rect { x, y, width, height }, ElementType::Text);
        node.background = background;
        node.text = lines.join("\n");
        node.font_size = font_size;
        node.color = el.value().attr("data-color").and_then(parse_color).unwrap_or((0, 0, 0, 255));
        node.align = match el.value().attr("data-align") {
            Some("center") => TextAlign::Center,
            Some("right") => TextAlign::Right,
            _ => TextAlign::Left,
        };
        nodes.push(node);
        return;
    }

    let height = attr_f32(el, "data-h").unwrap_or((parent.y + parent.height - y).max(0.0));
    let rect = Rect { x, y, width, height };
    if let Some(bg) = background {
        let mut node = LayoutNode::new(rect, ElementType::Block);
        node.background = Some(bg);
        nodes.push(node);
    }
    for child in el.children().filter_map(ElementRef::wrap) {
        layout_element(child, rect, nodes);
    }
}

/// Greedy word wrap against the estimated glyph advance.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let advance = font_size * CHAR_WIDTH_EM;
    let chars_per_line = if advance > 0.0 && max_width >= advance {
        (max_width / advance) as usize
    } else {
        1
    };

    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.chars().count() + word.chars().count() + 1 > chars_per_line {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(s: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = s.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                let v = c.to_digit(16)? as u8;
                *slot = v * 16 + v;
            }
            Some((out[0], out[1], out[2], 255))
        }
        6 => Some((channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Some((channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => None,
    }
}

fn attr_f32(el: ElementRef, name: &str) -> Option<f32> {
    el.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
}
