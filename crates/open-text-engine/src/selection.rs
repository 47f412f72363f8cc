//! # Selection State Machine
//!
//! Tracks the structural selection (an image or a table) separately from the
//! native text caret, together with the active table cell and the last text
//! range seen inside the document.
//!
//! ```text
//!              click image                 click cell / table chrome
//!   Idle ───────────────────▶ Image ◀──────────────────────▶ Table(cell?)
//!    ▲                          │  click outside (no drag)       │
//!    └──────────────────────────┴────────────────────────────────┘
//! ```
//!
//! Every reference held here is a [`NodeRef`]; nothing is assumed to still be
//! in the tree. [`StructuralSelection::revalidate`] drops whatever has left.

use serde::Serialize;

use crate::dom::{EditableDocument, NodeId, NodeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralKind {
    Image,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedNode {
    pub node: NodeRef,
    pub kind: StructuralKind,
}

/// One end of a text range: a node and an offset into it.
///
/// For text nodes the offset counts characters. For elements it counts
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeRef,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl TextRange {
    pub fn collapsed(at: Boundary) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Both ends still resolve to attached nodes.
    pub fn is_attached(&self, doc: &EditableDocument) -> bool {
        doc.is_attached(self.start.node) && doc.is_attached(self.end.node)
    }

    /// Deepest element containing both ends. A text node stands for its
    /// parent, like `commonAncestorContainer` followed by `parentNode`.
    pub fn container(&self, doc: &EditableDocument) -> Option<NodeId> {
        let start = doc.attached(self.start.node)?;
        let end = doc.attached(self.end.node)?;
        let common = doc.common_ancestor(start, end)?;
        match doc.get(common) {
            Some(node) if node.is_text_node() => node.parent,
            Some(_) => Some(common),
            None => None,
        }
    }
}

/// The structural elements around the node an event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitTarget {
    pub image: Option<NodeId>,
    pub cell: Option<NodeId>,
    pub table: Option<NodeId>,
}

impl HitTarget {
    pub fn locate(doc: &EditableDocument, target: NodeId) -> Self {
        Self {
            image: doc.closest(target, &["img"]),
            cell: doc.closest(target, &["td", "th"]),
            table: doc.closest(target, &["table"]),
        }
    }

    pub fn is_structural(&self) -> bool {
        self.image.is_some() || self.cell.is_some() || self.table.is_some()
    }
}

/// Which drag sessions are currently dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DragActivity {
    pub node: bool,
    pub column: bool,
}

impl DragActivity {
    pub fn any(&self) -> bool {
        self.node || self.column
    }
}

/// Public view of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Image {
        node: NodeRef,
        active_cell: Option<NodeRef>,
    },
    Table {
        table: NodeRef,
        active_cell: Option<NodeRef>,
    },
}

impl SelectionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SelectionState::Idle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructuralSelection {
    selected: Option<SelectedNode>,
    active_cell: Option<NodeRef>,
    saved: Option<TextRange>,
}

impl StructuralSelection {
    pub fn selected(&self) -> Option<SelectedNode> {
        self.selected
    }

    pub fn active_cell(&self) -> Option<NodeRef> {
        self.active_cell
    }

    pub fn saved_selection(&self) -> Option<TextRange> {
        self.saved
    }

    pub fn selected_table(&self) -> Option<NodeRef> {
        self.selected
            .filter(|s| s.kind == StructuralKind::Table)
            .map(|s| s.node)
    }

    pub fn selected_image(&self) -> Option<NodeRef> {
        self.selected
            .filter(|s| s.kind == StructuralKind::Image)
            .map(|s| s.node)
    }

    pub fn state(&self) -> SelectionState {
        match self.selected {
            None => SelectionState::Idle,
            Some(SelectedNode {
                node,
                kind: StructuralKind::Image,
            }) => SelectionState::Image {
                node,
                active_cell: self.active_cell,
            },
            Some(SelectedNode {
                node,
                kind: StructuralKind::Table,
            }) => SelectionState::Table {
                table: node,
                active_cell: self.active_cell,
            },
        }
    }

    pub fn select_image(&mut self, node: NodeRef) {
        self.selected = Some(SelectedNode {
            node,
            kind: StructuralKind::Image,
        });
    }

    pub fn select_table(&mut self, node: NodeRef) {
        self.selected = Some(SelectedNode {
            node,
            kind: StructuralKind::Table,
        });
    }

    pub fn set_active_cell(&mut self, cell: Option<NodeRef>) {
        self.active_cell = cell;
    }

    pub fn save(&mut self, range: TextRange) {
        self.saved = Some(range);
    }

    /// Back to `Idle`. The saved text range is kept.
    pub fn clear(&mut self) {
        self.selected = None;
        self.active_cell = None;
    }

    /// Applies a click on `target`. Returns true if the target was structural.
    ///
    /// A cell sets the active cell and selects its table. An image then takes
    /// the selection over, so an image inside a cell wins while the cell stays
    /// active for later table actions.
    pub fn click(&mut self, doc: &EditableDocument, target: NodeId, drag: DragActivity) -> bool {
        let hit = HitTarget::locate(doc, target);
        self.apply_hit(doc, hit, drag, true);
        hit.is_structural()
    }

    /// Applies a context-menu request. Only structural targets change state;
    /// returns whether the native menu should be suppressed.
    pub fn context_menu(
        &mut self,
        doc: &EditableDocument,
        target: NodeId,
        drag: DragActivity,
    ) -> bool {
        let hit = HitTarget::locate(doc, target);
        if !hit.is_structural() {
            return false;
        }
        self.apply_hit(doc, hit, drag, false);
        true
    }

    /// `clear_cell` drops the active cell when the hit lands outside any cell.
    /// Context menus keep it so a right-click on table chrome still targets
    /// the last clicked cell.
    fn apply_hit(
        &mut self,
        doc: &EditableDocument,
        hit: HitTarget,
        drag: DragActivity,
        clear_cell: bool,
    ) {
        match hit.cell {
            Some(cell) => {
                self.active_cell = doc.node_ref(cell);
                if let Some(table) = doc.closest(cell, &["table"]) {
                    self.select_table_if_changed(doc, table);
                }
            }
            None if clear_cell && !drag.column => self.active_cell = None,
            None => {}
        }

        if let Some(image) = hit.image {
            if let Some(node) = doc.node_ref(image) {
                if self.selected_image() != Some(node) {
                    log::debug!("image {image} selected");
                }
                self.select_image(node);
            }
            return;
        }

        if let Some(table) = hit.table {
            self.select_table_if_changed(doc, table);
            return;
        }

        if !drag.any() && self.selected.is_some() {
            log::debug!("click outside structural content, selection cleared");
            self.clear();
        }
    }

    fn select_table_if_changed(&mut self, doc: &EditableDocument, table: NodeId) {
        let Some(node) = doc.node_ref(table) else {
            return;
        };
        if self.selected_table() != Some(node) {
            log::debug!("table {table} selected");
            self.select_table(node);
        }
    }

    /// Follows the native caret. Returns false if the range is not inside the
    /// document, in which case nothing changes.
    pub fn selection_change(
        &mut self,
        doc: &EditableDocument,
        range: TextRange,
        drag: DragActivity,
    ) -> bool {
        let Some(container) = range.container(doc) else {
            return false;
        };
        self.saved = Some(range);

        // Images are not caret targets; the caret inside one leaves things be.
        if doc.closest(container, &["img"]).is_some() {
            return true;
        }

        if let Some(table) = doc.closest(container, &["table"]) {
            if let Some(cell) = doc.closest(container, &["td", "th"]) {
                self.active_cell = doc.node_ref(cell);
            }
            self.select_table_if_changed(doc, table);
        } else if !drag.any() && self.selected_table().is_some() {
            log::debug!("caret left the table, selection cleared");
            self.clear();
        }
        true
    }

    /// Drops references that no longer resolve to attached nodes. Returns
    /// true if the selected node itself was lost.
    ///
    /// An active cell outside the selected table is dropped too.
    pub fn revalidate(&mut self, doc: &EditableDocument) -> bool {
        if let Some(selected) = self.selected {
            if !doc.is_attached(selected.node) {
                log::debug!("selected {:?} left the document", selected.kind);
                self.clear();
                return true;
            }
        }

        let cell = self.active_cell.and_then(|cell| doc.attached(cell));
        let cell_in_table = match (cell, self.selected_table().and_then(|t| doc.attached(t))) {
            (Some(cell), Some(table)) => doc.contains(table, cell),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !cell_in_table {
            self.active_cell = None;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const DOC: &str = "<p>intro <b>bold</b></p>\
        <table><tbody>\
        <tr><td>a</td><td><img src=\"in-cell.png\"></td></tr>\
        <tr><td>c</td><td>d</td></tr>\
        </tbody></table>\
        <p><img src=\"free.png\"></p>";

    fn at(doc: &EditableDocument, path: &[usize]) -> NodeId {
        doc.node_at_path(path).unwrap()
    }

    fn handle(doc: &EditableDocument, path: &[usize]) -> NodeRef {
        doc.node_ref(at(doc, path)).unwrap()
    }

    fn caret(doc: &EditableDocument, path: &[usize], offset: usize) -> TextRange {
        TextRange::collapsed(Boundary {
            node: handle(doc, path),
            offset,
        })
    }

    #[test]
    fn test_click_cell_selects_table_and_cell() {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();

        assert!(selection.click(&doc, at(&doc, &[1, 0, 1, 0, 0]), DragActivity::default()));
        assert_eq!(
            selection.state(),
            SelectionState::Table {
                table: handle(&doc, &[1]),
                active_cell: Some(handle(&doc, &[1, 0, 1, 0])),
            }
        );
    }

    #[test]
    fn test_image_in_cell_wins_but_keeps_active_cell() {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();

        selection.click(&doc, at(&doc, &[1, 0, 0, 1, 0]), DragActivity::default());
        assert_eq!(
            selection.state(),
            SelectionState::Image {
                node: handle(&doc, &[1, 0, 0, 1, 0]),
                active_cell: Some(handle(&doc, &[1, 0, 0, 1])),
            }
        );
    }

    #[test]
    fn test_free_image_clears_active_cell() {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[1, 0, 0, 0]), DragActivity::default());

        selection.click(&doc, at(&doc, &[2, 0]), DragActivity::default());
        assert_eq!(selection.selected_image(), Some(handle(&doc, &[2, 0])));
        assert_eq!(selection.active_cell(), None);
    }

    #[rstest]
    #[case::no_drag(DragActivity::default(), true)]
    #[case::node_drag(DragActivity { node: true, column: false }, false)]
    #[case::column_drag(DragActivity { node: false, column: true }, false)]
    fn test_click_outside(#[case] drag: DragActivity, #[case] cleared: bool) {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[1, 0, 0, 0]), DragActivity::default());

        assert!(!selection.click(&doc, at(&doc, &[0, 0]), drag));
        assert_eq!(selection.state().is_idle(), cleared);
    }

    #[test]
    fn test_context_menu_outside_is_native() {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[2, 0]), DragActivity::default());

        assert!(!selection.context_menu(&doc, at(&doc, &[0]), DragActivity::default()));
        assert_eq!(selection.selected_image(), Some(handle(&doc, &[2, 0])));
    }

    #[test]
    fn test_context_menu_on_caption_keeps_active_cell() {
        let doc = EditableDocument::from_markup(
            "<table><caption>Totals</caption><tbody><tr><td>a</td></tr></tbody></table>",
        );
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[0, 1, 0, 0]), DragActivity::default());

        assert!(selection.context_menu(&doc, at(&doc, &[0, 0]), DragActivity::default()));
        assert_eq!(
            selection.state(),
            SelectionState::Table {
                table: handle(&doc, &[0]),
                active_cell: Some(handle(&doc, &[0, 1, 0, 0])),
            }
        );
    }

    #[test]
    fn test_caret_into_table_selects_it() {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();

        assert!(selection.selection_change(
            &doc,
            caret(&doc, &[1, 0, 1, 1, 0], 1),
            DragActivity::default()
        ));
        assert_eq!(selection.selected_table(), Some(handle(&doc, &[1])));
        assert_eq!(selection.active_cell(), Some(handle(&doc, &[1, 0, 1, 1])));
        assert!(selection.saved_selection().is_some());
    }

    #[test]
    fn test_caret_leaving_table_deselects_it() {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[1, 0, 0, 0]), DragActivity::default());

        selection.selection_change(&doc, caret(&doc, &[0, 0], 2), DragActivity::default());
        assert!(selection.state().is_idle());
    }

    #[test]
    fn test_caret_leaves_image_selection_alone() {
        let doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[2, 0]), DragActivity::default());

        selection.selection_change(&doc, caret(&doc, &[0, 0], 2), DragActivity::default());
        assert_eq!(selection.selected_image(), Some(handle(&doc, &[2, 0])));
    }

    #[test]
    fn test_range_outside_document_is_ignored() {
        let mut doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        let stray = doc.create_text_node("elsewhere");
        let range = TextRange::collapsed(Boundary {
            node: doc.node_ref(stray).unwrap(),
            offset: 0,
        });

        assert!(!selection.selection_change(&doc, range, DragActivity::default()));
        assert_eq!(selection.saved_selection(), None);
    }

    #[test]
    fn test_revalidate_drops_detached_selection() {
        let mut doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[1, 0, 0, 0]), DragActivity::default());

        let table = at(&doc, &[1]);
        doc.remove_node(table);
        assert!(selection.revalidate(&doc));
        assert!(selection.state().is_idle());
        assert_eq!(selection.active_cell(), None);
    }

    #[test]
    fn test_revalidate_drops_detached_cell_only() {
        let mut doc = EditableDocument::from_markup(DOC);
        let mut selection = StructuralSelection::default();
        selection.click(&doc, at(&doc, &[1, 0, 1, 0]), DragActivity::default());

        let row = at(&doc, &[1, 0, 1]);
        doc.remove_node(row);
        assert!(!selection.revalidate(&doc));
        assert_eq!(selection.selected_table(), Some(handle(&doc, &[1])));
        assert_eq!(selection.active_cell(), None);
    }
}
