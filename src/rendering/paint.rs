//! Paint commands in logical units, built from a laid-out surface

use super::layout::{ElementType, TextAlign};
use super::surface::Surface;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rgba: (u8, u8, u8, u8),
    },
    /// A single line of text placed in a line box of `width` starting at
    /// `x`; `y` is the top of the line box. Alignment is resolved against
    /// the measured glyph advance when the line is rasterized.
    Text {
        x: f32,
        y: f32,
        width: f32,
        align: TextAlign,
        font_size: f32,
        rgba: (u8, u8, u8, u8),
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        src: String,
    },
}

/// Flatten a surface into paint order. Does not depend on any display scale.
pub fn build_display_list(surface: &Surface) -> Vec<PaintCommand> {
    let mut cmds = Vec::new();
    for node in &surface.nodes {
        let r = node.rect;
        if let Some(rgba) = node.background {
            cmds.push(PaintCommand::SolidRect { x: r.x, y: r.y, width: r.width, height: r.height, rgba });
        }
        match node.elem_type {
            ElementType::Block => {}
            ElementType::Image => {
                if let Some(src) = &node.src {
                    cmds.push(PaintCommand::Image { x: r.x, y: r.y, width: r.width, height: r.height, src: src.clone() });
                }
            }
            ElementType::Text => {
                for (i, line) in node.text.lines().enumerate() {
                    cmds.push(PaintCommand::Text {
                        x: r.x,
                        y: r.y + i as f32 * node.line_height(),
                        width: r.width,
                        align: node.align,
                        font_size: node.font_size,
                        rgba: node.color,
                        text: line.to_string(),
                    });
                }
            }
        }
    }
    cmds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::{LayoutNode, Rect, SurfaceHandle};

    fn text_node(text: &str, align: TextAlign) -> LayoutNode {
        LayoutNode {
            rect: Rect { x: 0.0, y: 10.0, width: 100.0, height: 40.0 },
            elem_type: ElementType::Text,
            background: None,
            text: text.to_string(),
            color: (1, 2, 3, 255),
            font_size: 10.0,
            align,
            src: None,
        }
    }

    #[test]
    fn text_lines_are_stacked_and_aligned() {
        let surface = Surface {
            handle: SurfaceHandle::new("s"),
            width: 100.0,
            height: 100.0,
            nodes: vec![text_node("abcd\nab", TextAlign::Center)],
        };
        let cmds = build_display_list(&surface);
        assert_eq!(cmds.len(), 2);
        match (&cmds[0], &cmds[1]) {
            (
                PaintCommand::Text { x: x0, y: y0, width, align, text: t0, .. },
                PaintCommand::Text { x: x1, y: y1, text: t1, .. },
            ) => {
                assert_eq!((*x0, *x1), (0.0, 0.0));
                assert_eq!(*width, 100.0);
                assert_eq!(*align, TextAlign::Center);
                assert_eq!((t0.as_str(), t1.as_str()), ("abcd", "ab"));
                assert_eq!(*y0, 10.0);
                // line height 10 * 1.3
                assert!((y1 - 23.0).abs() < 1e-3);
            }
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn backgrounds_precede_content() {
        let mut node = text_node("a", TextAlign::Left);
        node.background = Some((9, 9, 9, 255));
        let surface = Surface { handle: SurfaceHandle::new("s"), width: 1.0, height: 1.0, nodes: vec![node] };
        let cmds = build_display_list(&surface);
        assert!(matches!(cmds[0], PaintCommand::SolidRect { rgba: (9, 9, 9, 255), .. }));
        assert!(matches!(cmds[1], PaintCommand::Text { .. }));
    }
}
