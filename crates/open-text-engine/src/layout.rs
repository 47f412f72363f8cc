//! Deterministic headless layout.
//!
//! Blocks stack top to bottom at the container's left edge, one line each.
//! Tables are one line per row with cells splitting the table width evenly
//! unless a cell carries an explicit `width: Npx`. Images sit at the top left
//! of their parent's box. Any inline `width: Npx` on a block, table or image
//! is honoured, so drag resizes show up in the next query.
//!
//! This is enough to drive the engine from tests, benchmarks and the command
//! line without a browser.

use crate::dom::{EditableDocument, NodeId};
use crate::geometry::{LayoutProvider, Rect};
use crate::table;

#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub container: Rect,
    pub line_height: f64,
    pub image_width: f64,
    pub image_height: f64,
    /// Vertical scroll offset of the container's content.
    pub scroll_top: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(Rect::new(0.0, 0.0, 800.0, 600.0))
    }
}

impl GridLayout {
    pub fn new(container: Rect) -> Self {
        Self {
            container,
            line_height: 40.0,
            image_width: 300.0,
            image_height: 200.0,
            scroll_top: 0.0,
        }
    }

    pub fn scroll_to(&mut self, top: f64) {
        self.scroll_top = top.max(0.0);
    }

    fn width_of(&self, doc: &EditableDocument, node: NodeId, fallback: f64) -> f64 {
        doc.style(node).px("width").unwrap_or(fallback)
    }

    fn block_height(&self, doc: &EditableDocument, block: NodeId) -> f64 {
        if doc.is_element_with_tag(block, "table") {
            return self.line_height * table::rows(doc, block).len().max(1) as f64;
        }
        if contains_image(doc, block) {
            self.line_height.max(self.image_height)
        } else {
            self.line_height
        }
    }

    fn top_level_rect(&self, doc: &EditableDocument, block: NodeId) -> Option<Rect> {
        let mut y = self.container.y - self.scroll_top;
        for child in doc.element_children(doc.root()) {
            let height = self.block_height(doc, child);
            if child == block {
                let width = self.width_of(doc, child, self.container.width);
                return Some(Rect::new(self.container.x, y, width, height));
            }
            y += height;
        }
        None
    }

    fn rect_of(&self, doc: &EditableDocument, node: NodeId) -> Option<Rect> {
        let parent = doc.get(node)?.parent?;
        if parent == doc.root() {
            return self.top_level_rect(doc, node);
        }
        match doc.tag(node) {
            Some("tr") => {
                let table = doc.closest(parent, &["table"])?;
                let table_rect = self.rect_of(doc, table)?;
                let index = table::rows(doc, table).iter().position(|&r| r == node)?;
                Some(Rect::new(
                    table_rect.x,
                    table_rect.y + self.line_height * index as f64,
                    table_rect.width,
                    self.line_height,
                ))
            }
            Some("td" | "th") => {
                let row_rect = self.rect_of(doc, parent)?;
                let cells = table::cells(doc, parent);
                let share = row_rect.width / cells.len().max(1) as f64;
                let mut x = row_rect.x;
                for cell in cells {
                    let width = self.width_of(doc, cell, share);
                    if cell == node {
                        return Some(Rect::new(x, row_rect.y, width, row_rect.height));
                    }
                    x += width;
                }
                None
            }
            Some("img") => {
                let parent_rect = self.rect_of(doc, parent)?;
                Some(Rect::new(
                    parent_rect.x,
                    parent_rect.y,
                    self.width_of(doc, node, self.image_width),
                    self.image_height,
                ))
            }
            _ => self.rect_of(doc, parent),
        }
    }
}

fn contains_image(doc: &EditableDocument, node: NodeId) -> bool {
    doc.is_element_with_tag(node, "img")
        || doc
            .element_children(node)
            .into_iter()
            .any(|child| contains_image(doc, child))
}

impl LayoutProvider for GridLayout {
    fn bounding_rect(&self, doc: &EditableDocument, node: NodeId) -> Option<Rect> {
        if !doc.is_connected(node) || node == doc.root() {
            return None;
        }
        self.rect_of(doc, node)
    }

    fn container_rect(&self) -> Rect {
        self.container
    }
}
