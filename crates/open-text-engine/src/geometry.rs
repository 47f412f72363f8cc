//! # Geometry Mapper
//!
//! Turns the live on-screen boxes reported by the layout collaborator into
//! overlay state expressed in the scroll container's coordinate frame:
//!
//! - the **OverlayRect** drawn around the selected image or table, and
//! - one **ColumnResizeHandle** rail per cell of the owning table's first row.
//!
//! Nothing here is cached between calls. Every recomputation starts from the
//! current tree and the current layout, so stale geometry cannot accumulate.
//!
//! Rails are emitted for the first row only and assume all rows line up with
//! it. A table whose later rows have a different cell count still gets exactly
//! one rail per first-row cell.

use serde::Serialize;

use crate::dom::{EditableDocument, NodeId, NodeRef};
use crate::selection::StructuralSelection;
use crate::table;

/// Box in viewport coordinates, like `getBoundingClientRect()`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Layout queries the engine needs from its host.
///
/// Answers must reflect the current tree, including any style the engine has
/// just written.
pub trait LayoutProvider {
    /// On-screen box of a node, or `None` if it is not laid out.
    fn bounding_rect(&self, doc: &EditableDocument, node: NodeId) -> Option<Rect>;

    /// On-screen box of the scrolling container around the editable root.
    fn container_rect(&self) -> Rect;

    /// Rendered width used as the starting point of a drag.
    fn offset_width(&self, doc: &EditableDocument, node: NodeId) -> Option<f64> {
        self.bounding_rect(doc, node).map(|rect| rect.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OverlayRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnResizeHandle {
    pub left: f64,
    pub top: f64,
    pub height: f64,
    #[serde(skip)]
    pub cell: NodeRef,
}

/// Result of one recomputation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OverlayGeometry {
    pub overlay: Option<OverlayRect>,
    pub column_handles: Vec<ColumnResizeHandle>,
}

impl OverlayGeometry {
    pub fn is_empty(&self) -> bool {
        self.overlay.is_none() && self.column_handles.is_empty()
    }
}

/// What a recomputation found out about the selection it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum Recompute {
    Fresh(OverlayGeometry),
    /// The selected node has left the tree; the caller must go idle.
    SelectionDetached,
}

pub fn recompute(
    doc: &EditableDocument,
    selection: &StructuralSelection,
    layout: &dyn LayoutProvider,
) -> Recompute {
    let container = layout.container_rect();

    let overlay = match selection.selected() {
        Some(selected) => match doc.attached(selected.node) {
            Some(node) => layout
                .bounding_rect(doc, node)
                .map(|rect| relative_to(&container, &rect)),
            None => return Recompute::SelectionDetached,
        },
        None => None,
    };

    let column_handles = handle_table(doc, selection)
        .map(|table| column_handles(doc, table, &container, layout))
        .unwrap_or_default();

    log::trace!(
        "geometry recomputed: overlay={overlay:?}, {} column handles",
        column_handles.len()
    );
    Recompute::Fresh(OverlayGeometry {
        overlay,
        column_handles,
    })
}

fn relative_to(container: &Rect, rect: &Rect) -> OverlayRect {
    OverlayRect {
        top: rect.y - container.y,
        left: rect.x - container.x,
        width: rect.width,
        height: rect.height,
    }
}

/// The selected table, or else the table owning the active cell. An image
/// never owns rails.
fn handle_table(doc: &EditableDocument, selection: &StructuralSelection) -> Option<NodeId> {
    if let Some(table) = selection.selected_table().and_then(|t| doc.attached(t)) {
        return Some(table);
    }
    let cell = selection.active_cell().and_then(|c| doc.attached(c))?;
    doc.closest(cell, &["table"])
}

fn column_handles(
    doc: &EditableDocument,
    table: NodeId,
    container: &Rect,
    layout: &dyn LayoutProvider,
) -> Vec<ColumnResizeHandle> {
    let Some(table_rect) = layout.bounding_rect(doc, table) else {
        return Vec::new();
    };
    let Some(first_row) = table::rows(doc, table).first().copied() else {
        return Vec::new();
    };

    table::cells(doc, first_row)
        .into_iter()
        .filter_map(|cell| {
            let cell_rect = layout.bounding_rect(doc, cell)?;
            Some(ColumnResizeHandle {
                left: (cell_rect.x - container.x) + cell_rect.width,
                top: table_rect.y - container.y,
                height: table_rect.height,
                cell: doc.node_ref(cell)?,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Layout answering from a fixed map of boxes.
    #[derive(Debug, Default)]
    pub struct MapLayout {
        pub container: Rect,
        pub rects: HashMap<NodeId, Rect>,
    }

    impl LayoutProvider for MapLayout {
        fn bounding_rect(&self, _doc: &EditableDocument, node: NodeId) -> Option<Rect> {
            self.rects.get(&node).copied()
        }

        fn container_rect(&self) -> Rect {
            self.container
        }
    }
}
