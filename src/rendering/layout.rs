//! Block layout for the headless page.
//!
//! Only vertical geometry matters to the page (scroll position and
//! intersection ratios), so boxes are stacked as blocks with fixed padding
//! and text is wrapped at an estimated 8px per character. The gallery grid
//! is the one place where boxes sit side by side.

use super::Rect;
use crate::dom::{Document, NodeData, NodeId};
use crate::Viewport;
use std::collections::HashMap;

const PADDING: u32 = 8;
const CHAR_WIDTH: u32 = 8;
const LINE_HEIGHT: u32 = 16;
const GRID_GAP: u32 = 16;
const DEFAULT_IMAGE_HEIGHT: u32 = 300;

/// Number of gallery columns for a viewport width
pub fn gallery_columns(viewport_width: u32) -> u32 {
    match viewport_width {
        0..=767 => 1,
        768..=1023 => 2,
        _ => 3,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    boxes: HashMap<NodeId, Rect>,
    document_height: u32,
}

impl Layout {
    pub fn rect(&self, node: NodeId) -> Option<&Rect> {
        self.boxes.get(&node)
    }

    pub fn document_height(&self) -> u32 {
        self.document_height
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

struct Ctx<'a> {
    doc: &'a Document,
    viewport: Viewport,
    grid_class: &'a str,
    boxes: HashMap<NodeId, Rect>,
}

/// Lay out the rendered part of `doc`. Elements carrying `grid_class` are
/// laid out as the responsive gallery grid.
pub fn layout_document(doc: &Document, viewport: Viewport, grid_class: &str) -> Layout {
    let mut ctx = Ctx {
        doc,
        viewport,
        grid_class,
        boxes: HashMap::new(),
    };
    let start = doc.body().unwrap_or_else(|| doc.root());
    let height = layout_block(&mut ctx, start, 0, 0, viewport.width);
    Layout {
        boxes: ctx.boxes,
        document_height: height,
    }
}

fn text_height(chars: usize, width: u32) -> u32 {
    if chars == 0 {
        return 0;
    }
    let per_line = (width.saturating_sub(PADDING * 2) / CHAR_WIDTH).max(1) as usize;
    let lines = chars.div_ceil(per_line) as u32;
    lines * LINE_HEIGHT
}

fn image_height(doc: &Document, node: NodeId, width: u32) -> u32 {
    let dim = |name: &str| doc.attr(node, name).and_then(|v| v.trim().parse::<u32>().ok());
    match (dim("width"), dim("height")) {
        (Some(w), Some(h)) if w > 0 => ((h as u64 * width as u64) / w as u64) as u32,
        _ => DEFAULT_IMAGE_HEIGHT,
    }
}

fn layout_block(ctx: &mut Ctx<'_>, node: NodeId, x: i32, y: i32, width: u32) -> u32 {
    let doc = ctx.doc;
    if !doc.is_rendered(node) {
        return 0;
    }

    // Overlays are fixed to the viewport and take no space in the flow.
    if doc.is_overlay(node) {
        let vp = ctx.viewport;
        ctx.boxes.insert(node, Rect { x: 0, y, width: vp.width, height: vp.height });
        return 0;
    }

    if doc.tag(node) == Some("img") {
        let height = image_height(doc, node, width);
        ctx.boxes.insert(node, Rect { x, y, width, height });
        return height;
    }

    if doc.has_class(node, ctx.grid_class) {
        let height = layout_grid(ctx, node, x, y, width);
        ctx.boxes.insert(node, Rect { x, y, width, height });
        return height;
    }

    let inner_width = width.saturating_sub(PADDING * 2);
    let mut cursor = y + PADDING as i32;
    let mut pending_chars = 0usize;
    for &child in doc.children(node) {
        match doc.data(child) {
            NodeData::Text(t) => pending_chars += t.split_whitespace().map(|w| w.len() + 1).sum::<usize>(),
            NodeData::Element(_) => {
                cursor += text_height(pending_chars, width) as i32;
                pending_chars = 0;
                cursor += layout_block(ctx, child, x + PADDING as i32, cursor, inner_width) as i32;
            }
        }
    }
    cursor += text_height(pending_chars, width) as i32;

    let height = (cursor - y) as u32 + PADDING;
    ctx.boxes.insert(node, Rect { x, y, width, height });
    height
}

fn layout_grid(ctx: &mut Ctx<'_>, node: NodeId, x: i32, y: i32, width: u32) -> u32 {
    let cols = gallery_columns(ctx.viewport.width);
    let col_width = width.saturating_sub(GRID_GAP * (cols - 1)) / cols;
    let items: Vec<NodeId> = ctx
        .doc
        .element_children(node)
        .filter(|c| ctx.doc.is_rendered(*c))
        .collect();

    let mut row_y = y;
    for row in items.chunks(cols as usize) {
        let mut row_height = 0;
        for (i, &item) in row.iter().enumerate() {
            let item_x = x + (i as u32 * (col_width + GRID_GAP)) as i32;
            row_height = row_height.max(layout_block(ctx, item, item_x, row_y, col_width));
        }
        row_y += (row_height + GRID_GAP) as i32;
    }
    (row_y - y) as u32
}
