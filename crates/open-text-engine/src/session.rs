//! # Editor Session
//!
//! `EditorSession` is the one object a host creates per mounted editor. It owns
//! the document, the structural selection, the overlay geometry, both drag
//! controllers, the toolbar state and the listener registrations, and it is
//! the only place where they meet.
//!
//! Every entry point is a plain `&mut self` method called from the host's
//! event loop. Each one finishes all of its work before returning, except
//! where it schedules a [`DeferredTask`] for the host to run on the next
//! paint with [`EditorSession::run_deferred`].
//!
//! While the session is in source mode the tree is not shown, so every
//! structural entry point is ignored until [`EditorSession::toggle_source_mode`]
//! is called again.

use serde::Serialize;

use crate::align::{self, Alignment};
use crate::dom::{EditableDocument, NodeData, NodeId, NodeRef};
use crate::events::{DeferredTask, ListenerTarget, Listeners, Subscription, TaskQueue};
use crate::formats::{EditingHost, FormatCommand, FormatState};
use crate::geometry::{
    self, ColumnResizeHandle, LayoutProvider, OverlayGeometry, OverlayRect, Recompute,
};
use crate::resize::{COLUMN_MIN_WIDTH, DragController, DragKind, NODE_MIN_WIDTH};
use crate::selection::{
    Boundary, DragActivity, SelectedNode, SelectionState, StructuralKind, StructuralSelection,
    TextRange,
};
use crate::table::{self, DEFAULT_CELL_STYLE, TableAction, TableOutcome};

/// Style of images inserted through [`EditorSession::insert_image`].
pub const IMAGE_STYLE: &str = "width: 300px; max-width: 100%; height: auto; border-radius: 4px; display: inline-block; cursor: pointer; border: 1px solid transparent;";

const TAB_MARKUP: &str = "&nbsp;&nbsp;&nbsp;&nbsp;";

/// Elements that cannot sit inside a paragraph.
const BLOCK_TAGS: &[&str] = &[
    "table", "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "blockquote", "pre", "hr",
];

/// Blocks that are split when block content is inserted inside them.
const TEXT_BLOCKS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "pre"];

/// Tunables a host may override, typically from its configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub node_min_width: f64,
    pub column_min_width: f64,
    pub default_table_rows: usize,
    pub default_table_cols: usize,
    pub cell_style: String,
    pub placeholder: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            node_min_width: NODE_MIN_WIDTH,
            column_min_width: COLUMN_MIN_WIDTH,
            default_table_rows: 3,
            default_table_cols: 3,
            cell_style: DEFAULT_CELL_STYLE.to_string(),
            placeholder: "Start typing...".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Visual,
    /// Raw markup is being edited as text.
    Source { markup: String },
}

/// Whether the host should show its native context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuDisposition {
    Native,
    Suppressed,
}

/// Buttons offered by the floating bar above the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatingAction {
    Align(Alignment),
    Table(TableAction),
    Delete,
}

pub struct EditorSession<H: EditingHost, L: LayoutProvider> {
    doc: EditableDocument,
    host: H,
    layout: L,
    options: SessionOptions,
    selection: StructuralSelection,
    geometry: OverlayGeometry,
    node_drag: DragController,
    column_drag: DragController,
    formats: FormatState,
    mode: EditorMode,
    empty: bool,
    tasks: TaskQueue,
    listeners: Listeners,
    on_change: Option<Box<dyn FnMut(&str)>>,
    _subscriptions: [Subscription; 3],
}

impl<H: EditingHost, L: LayoutProvider> EditorSession<H, L> {
    pub fn new(host: H, layout: L, options: SessionOptions) -> Self {
        let listeners = Listeners::new();
        let subscriptions = [
            listeners.subscribe(ListenerTarget::ContainerScroll),
            listeners.subscribe(ListenerTarget::WindowResize),
            listeners.subscribe(ListenerTarget::SelectionChange),
        ];
        Self {
            doc: EditableDocument::new(),
            host,
            layout,
            node_drag: DragController::new(DragKind::Node, options.node_min_width),
            column_drag: DragController::new(DragKind::Column, options.column_min_width),
            options,
            selection: StructuralSelection::default(),
            geometry: OverlayGeometry::default(),
            formats: FormatState::default(),
            mode: EditorMode::Visual,
            empty: true,
            tasks: TaskQueue::default(),
            listeners,
            on_change: None,
            _subscriptions: subscriptions,
        }
    }

    /// Registers the content-changed callback. It receives the serialized
    /// markup after every mutation.
    pub fn set_on_change(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    // ============ Accessors ============

    pub fn document(&self) -> &EditableDocument {
        &self.doc
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut L {
        &mut self.layout
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn selected(&self) -> Option<SelectedNode> {
        self.selection.selected()
    }

    pub fn active_cell(&self) -> Option<NodeRef> {
        self.selection.active_cell()
    }

    pub fn saved_selection(&self) -> Option<TextRange> {
        self.selection.saved_selection()
    }

    pub fn overlay(&self) -> Option<OverlayRect> {
        self.geometry.overlay
    }

    pub fn column_handles(&self) -> &[ColumnResizeHandle] {
        &self.geometry.column_handles
    }

    pub fn geometry(&self) -> &OverlayGeometry {
        &self.geometry
    }

    pub fn formats(&self) -> &FormatState {
        &self.formats
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn is_source_mode(&self) -> bool {
        matches!(self.mode, EditorMode::Source { .. })
    }

    pub fn source_markup(&self) -> Option<&str> {
        match &self.mode {
            EditorMode::Source { markup } => Some(markup),
            EditorMode::Visual => None,
        }
    }

    /// True when the document holds no visible text.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn placeholder(&self) -> &str {
        &self.options.placeholder
    }

    pub fn drag_activity(&self) -> DragActivity {
        DragActivity {
            node: self.node_drag.is_dragging(),
            column: self.column_drag.is_dragging(),
        }
    }

    pub fn floating_actions(&self) -> Vec<FloatingAction> {
        let Some(selected) = self.selection.selected() else {
            return Vec::new();
        };
        let mut actions = match selected.kind {
            StructuralKind::Image => vec![
                FloatingAction::Align(Alignment::Left),
                FloatingAction::Align(Alignment::Center),
                FloatingAction::Align(Alignment::Right),
            ],
            StructuralKind::Table if self.selection.active_cell().is_some() => [
                TableAction::RowAbove,
                TableAction::RowBelow,
                TableAction::ColumnLeft,
                TableAction::ColumnRight,
                TableAction::DeleteRow,
                TableAction::DeleteColumn,
            ]
            .into_iter()
            .map(FloatingAction::Table)
            .collect(),
            StructuralKind::Table => Vec::new(),
        };
        actions.push(FloatingAction::Delete);
        actions
    }

    // ============ Internal plumbing ============

    fn refresh_geometry(&mut self) {
        if self.is_source_mode() {
            self.geometry = OverlayGeometry::default();
            return;
        }
        match geometry::recompute(&self.doc, &self.selection, &self.layout) {
            Recompute::Fresh(geometry) => self.geometry = geometry,
            Recompute::SelectionDetached => {
                log::debug!("selected node detached, going idle");
                self.selection.clear();
                self.geometry = OverlayGeometry::default();
            }
        }
    }

    fn refresh_formats(&mut self) {
        if self.is_source_mode() {
            return;
        }
        self.formats
            .recompute(&self.doc, &self.host, self.selection.saved_selection());
    }

    fn notify_change(&mut self) {
        let markup = self.doc.markup();
        if let Some(callback) = self.on_change.as_mut() {
            callback(&markup);
        }
    }

    /// Everything that follows a change to the tree: the caret block, toolbar
    /// state, stale references, geometry, the empty flag and the host callback.
    fn process_input(&mut self) {
        self.doc.ensure_block();
        self.selection.revalidate(&self.doc);
        self.refresh_formats();
        self.refresh_geometry();
        self.empty = self.doc.text_content(self.doc.root()).trim().is_empty();
        self.notify_change();
    }

    fn restore_selection_or_focus(&mut self) {
        match self
            .selection
            .saved_selection()
            .filter(|range| range.is_attached(&self.doc))
        {
            Some(range) => self.host.restore_selection(&range),
            None => self.host.focus(),
        }
    }

    /// Where inserted content goes: the start of the saved selection as
    /// `(parent, child index)`, splitting a text node if the caret is inside
    /// one. Without a usable selection, the end of the root.
    fn insertion_point(&mut self) -> (NodeId, usize) {
        let root = self.doc.root();
        let end_of_root = (root, self.doc.get(root).map_or(0, |n| n.children.len()));
        let Some(start) = self
            .selection
            .saved_selection()
            .filter(|range| range.is_attached(&self.doc))
            .map(|range| range.start)
        else {
            return end_of_root;
        };
        let Some(node) = self.doc.attached(start.node) else {
            return end_of_root;
        };

        match self.doc.get(node) {
            Some(n) if n.is_text_node() => {
                let Some(parent) = n.parent else {
                    return end_of_root;
                };
                let index = match self.split_text(node, start.offset) {
                    Some(tail) => self.doc.index_of_child(parent, tail),
                    None => self.doc.index_of_child(parent, node).map(|i| i + 1),
                };
                index.map_or(end_of_root, |index| (parent, index))
            }
            Some(n) => (node, start.offset.min(n.children.len())),
            None => end_of_root,
        }
    }

    /// Inserts detached nodes at the saved selection and moves the saved
    /// caret after them. Block content splits the paragraph around the caret
    /// instead of nesting inside it.
    fn insert_nodes(&mut self, nodes: &[NodeId]) {
        let Some(&last) = nodes.last() else {
            return;
        };
        let (mut parent, mut index) = self.insertion_point();

        let has_block = nodes
            .iter()
            .any(|&node| self.doc.tag(node).is_some_and(|tag| BLOCK_TAGS.contains(&tag)));
        if has_block {
            if let Some(position) = self
                .doc
                .closest(parent, TEXT_BLOCKS)
                .and_then(|block| self.doc.split_up_to(parent, index, block))
            {
                (parent, index) = position;
            }
        }

        let next = self
            .doc
            .get(parent)
            .and_then(|node| node.children.get(index).copied());
        for &node in nodes {
            match next {
                Some(next) => self.doc.insert_before(next, node),
                None => self.doc.append_child(parent, node),
            }
        }

        let caret = self.doc.get(last).and_then(|node| node.parent).and_then(|parent| {
            let offset = self.doc.index_of_child(parent, last)? + 1;
            Some(Boundary {
                node: self.doc.node_ref(parent)?,
                offset,
            })
        });
        if let Some(caret) = caret {
            self.selection.save(TextRange::collapsed(caret));
        }
    }

    /// Splits a text node at a character offset. Returns the node holding the
    /// text after the offset, or `None` if the offset is at the end.
    fn split_text(&mut self, text: NodeId, offset: usize) -> Option<NodeId> {
        if offset == 0 {
            return Some(text);
        }
        let tail = match self.doc.get_mut(text).map(|node| &mut node.data) {
            Some(NodeData::Text(content)) => {
                let byte = content.char_indices().nth(offset).map(|(i, _)| i)?;
                content.split_off(byte)
            }
            _ => return None,
        };
        let tail_node = self.doc.create_text_node(&tail);
        self.doc.insert_after(text, tail_node);
        Some(tail_node)
    }

    // ============ Selection events ============

    pub fn handle_click(&mut self, target: NodeId) {
        if self.is_source_mode() || !self.doc.is_connected(target) {
            return;
        }
        let drag = self.drag_activity();
        self.selection.click(&self.doc, target, drag);
        self.refresh_formats();
        self.refresh_geometry();
    }

    /// Selects a structural target under the pointer. Geometry is recomputed
    /// on the next paint, once the host has laid out the menu click.
    pub fn handle_context_menu(&mut self, target: NodeId) -> MenuDisposition {
        if self.is_source_mode() || !self.doc.is_connected(target) {
            return MenuDisposition::Native;
        }
        let drag = self.drag_activity();
        if !self.selection.context_menu(&self.doc, target, drag) {
            return MenuDisposition::Native;
        }
        self.refresh_formats();
        self.tasks.schedule(DeferredTask::RecomputeGeometry);
        MenuDisposition::Suppressed
    }

    /// Native selection moved. Ranges outside the document are ignored.
    pub fn handle_selection_change(&mut self, range: TextRange) {
        if self.is_source_mode() {
            return;
        }
        let drag = self.drag_activity();
        if self.selection.selection_change(&self.doc, range, drag) {
            self.refresh_formats();
            self.refresh_geometry();
        }
    }

    /// The tree was edited by the user (typing, paste, native undo).
    pub fn handle_input(&mut self) {
        if self.is_source_mode() {
            return;
        }
        self.process_input();
    }

    pub fn handle_scroll(&mut self) {
        if self.listeners.is_listening(ListenerTarget::ContainerScroll) {
            self.refresh_geometry();
        }
    }

    pub fn handle_window_resize(&mut self) {
        if self.listeners.is_listening(ListenerTarget::WindowResize) {
            self.refresh_geometry();
        }
    }

    /// Inserts four non-breaking spaces at the caret.
    pub fn handle_tab_key(&mut self) {
        if self.is_source_mode() {
            return;
        }
        let nodes = self.doc.parse_fragment(TAB_MARKUP);
        self.insert_nodes(&nodes);
        self.process_input();
    }

    /// Runs everything scheduled for the next paint. Returns how many tasks ran.
    pub fn run_deferred(&mut self) -> usize {
        let tasks: Vec<_> = self.tasks.drain().collect();
        for task in &tasks {
            match task {
                DeferredTask::RecomputeGeometry => self.refresh_geometry(),
            }
        }
        tasks.len()
    }

    // ============ Drag resize ============

    /// Starts resizing the selected node from the corner handle.
    pub fn start_node_resize(&mut self, pointer_x: f64) -> bool {
        if self.is_source_mode() || self.column_drag.is_dragging() {
            return false;
        }
        let Some(selected) = self.selection.selected() else {
            return false;
        };
        let Some(id) = self.doc.attached(selected.node) else {
            return false;
        };
        let width = self.layout.offset_width(&self.doc, id).unwrap_or_default();
        self.node_drag
            .start(&self.doc, &self.listeners, selected.node, pointer_x, width)
    }

    /// Starts resizing the column whose rail belongs to `cell`.
    pub fn start_column_resize(&mut self, cell: NodeRef, pointer_x: f64) -> bool {
        if self.is_source_mode() || self.node_drag.is_dragging() {
            return false;
        }
        let Some(id) = self.doc.attached(cell) else {
            return false;
        };
        let width = self.layout.offset_width(&self.doc, id).unwrap_or_default();
        self.column_drag
            .start(&self.doc, &self.listeners, cell, pointer_x, width)
    }

    pub fn handle_pointer_move(&mut self, pointer_x: f64) {
        let was_dragging = self.drag_activity().any();
        self.node_drag.pointer_move(&mut self.doc, pointer_x);
        self.column_drag.pointer_move(&mut self.doc, pointer_x);
        if was_dragging {
            self.refresh_geometry();
        }
    }

    /// Ends whichever drag is active, wherever the pointer was released.
    pub fn handle_pointer_up(&mut self) {
        let node = self.node_drag.end();
        let column = self.column_drag.end();
        if node || column {
            self.notify_change();
        }
    }

    /// Cancels an active drag and restores the width it started from.
    pub fn handle_escape(&mut self) -> bool {
        let node = self.node_drag.cancel(&mut self.doc);
        let column = self.column_drag.cancel(&mut self.doc);
        if node || column {
            self.refresh_geometry();
        }
        node || column
    }

    // ============ Structural actions ============

    pub fn table_action(&mut self, action: TableAction) -> TableOutcome {
        if self.is_source_mode() {
            return TableOutcome::Skipped;
        }
        let outcome = table::apply(
            &mut self.doc,
            &mut self.selection,
            action,
            &self.options.cell_style,
        );
        if outcome.is_applied() {
            self.process_input();
        }
        outcome
    }

    /// Aligns the selected node. Geometry follows on the next paint.
    pub fn align_selected(&mut self, alignment: Alignment) -> bool {
        if self.is_source_mode() {
            return false;
        }
        let Some(id) = self
            .selection
            .selected()
            .and_then(|selected| self.doc.attached(selected.node))
        else {
            return false;
        };
        log::debug!("aligning {id} {alignment}");
        align::apply(&mut self.doc, id, alignment);
        self.tasks.schedule(DeferredTask::RecomputeGeometry);
        self.notify_change();
        true
    }

    /// Removes the selected image or table and goes idle.
    pub fn delete_selected(&mut self) -> bool {
        if self.is_source_mode() {
            return false;
        }
        let Some(selected) = self.selection.selected() else {
            return false;
        };
        if let Some(id) = self.doc.attached(selected.node) {
            log::debug!("deleting selected {:?} {id}", selected.kind);
            self.doc.remove_node(id);
        }
        self.selection.clear();
        self.process_input();
        true
    }

    // ============ Imperative API ============

    pub fn focus(&mut self) {
        self.host.focus();
    }

    pub fn markup(&self) -> String {
        self.doc.markup()
    }

    /// Replaces the whole document. Structural selection is dropped.
    pub fn set_markup(&mut self, markup: &str) {
        self.doc.set_markup(markup);
        self.selection.clear();
        if let EditorMode::Source { markup: source } = &mut self.mode {
            *source = self.doc.markup();
        }
        self.process_input();
    }

    /// Parses `markup` and inserts it at the saved selection.
    pub fn insert_markup(&mut self, markup: &str) {
        if self.is_source_mode() {
            return;
        }
        self.restore_selection_or_focus();
        let nodes = self.doc.parse_fragment(markup);
        self.insert_nodes(&nodes);
        self.process_input();
    }

    /// Restores the saved selection and hands `command` to the host.
    pub fn exec_command(&mut self, command: FormatCommand, value: Option<&str>) -> bool {
        if self.is_source_mode() {
            return false;
        }
        self.restore_selection_or_focus();
        let handled = self.host.exec_command(&mut self.doc, &command, value);
        self.process_input();
        self.host.focus();
        handled
    }

    /// Inserts a `rows` × `cols` table at the saved selection. Zero falls back
    /// to the configured default.
    pub fn insert_table(&mut self, rows: usize, cols: usize) {
        if self.is_source_mode() {
            return;
        }
        self.restore_selection_or_focus();
        let rows = if rows == 0 {
            self.options.default_table_rows
        } else {
            rows
        };
        let cols = if cols == 0 {
            self.options.default_table_cols
        } else {
            cols
        };
        log::debug!("inserting {rows}x{cols} table");
        let nodes = table::build_table(&mut self.doc, rows, cols, &self.options.cell_style);
        self.insert_nodes(&nodes);
        self.process_input();
    }

    /// Inserts an image with an already-encoded `src` at the saved selection.
    pub fn insert_image(&mut self, src: &str) {
        if self.is_source_mode() {
            return;
        }
        self.restore_selection_or_focus();
        let image = self.doc.create_element(
            "img",
            &[("src", src), ("style", IMAGE_STYLE), ("draggable", "true")],
        );
        self.insert_nodes(&[image]);
        self.process_input();
    }

    /// Table action requested by the host rather than the floating bar.
    pub fn api_table_action(&mut self, action: TableAction) -> TableOutcome {
        if self.is_source_mode() {
            return TableOutcome::Skipped;
        }
        self.restore_selection_or_focus();
        self.table_action(action)
    }

    // ============ Source mode ============

    /// Switches between the rendered tree and raw markup editing. Returns
    /// true if the session is now in source mode.
    pub fn toggle_source_mode(&mut self) -> bool {
        match std::mem::replace(&mut self.mode, EditorMode::Visual) {
            EditorMode::Visual => {
                self.node_drag.end();
                self.column_drag.end();
                self.selection.clear();
                self.geometry = OverlayGeometry::default();
                self.mode = EditorMode::Source {
                    markup: self.doc.markup(),
                };
                log::debug!("entered source mode");
                true
            }
            EditorMode::Source { markup } => {
                log::debug!("left source mode");
                if markup != self.doc.markup() {
                    self.doc.set_markup(&markup);
                    self.process_input();
                }
                false
            }
        }
    }

    /// Edits the markup text while in source mode.
    pub fn set_source_markup(&mut self, markup: &str) {
        let EditorMode::Source { markup: source } = &mut self.mode else {
            return;
        };
        *source = markup.to_string();
        if let Some(callback) = self.on_change.as_mut() {
            callback(markup);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::testing::MapLayout;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct NullHost {
        restored: usize,
        focused: usize,
    }

    impl EditingHost for NullHost {
        fn exec_command(
            &mut self,
            _: &mut EditableDocument,
            _: &FormatCommand,
            _: Option<&str>,
        ) -> bool {
            false
        }

        fn query_command_state(&self, _: &FormatCommand) -> bool {
            false
        }

        fn query_command_value(&self, _: &FormatCommand) -> Option<String> {
            None
        }

        fn restore_selection(&mut self, _: &TextRange) {
            self.restored += 1;
        }

        fn focus(&mut self) {
            self.focused += 1;
        }
    }

    fn session(markup: &str) -> EditorSession<NullHost, MapLayout> {
        let mut session = EditorSession::new(
            NullHost::default(),
            MapLayout::default(),
            SessionOptions::default(),
        );
        session.set_markup(markup);
        session
    }

    fn caret_at(
        session: &EditorSession<NullHost, MapLayout>,
        path: &[usize],
        offset: usize,
    ) -> TextRange {
        let doc = session.document();
        TextRange::collapsed(Boundary {
            node: doc.node_ref(doc.node_at_path(path).unwrap()).unwrap(),
            offset,
        })
    }

    #[test]
    fn test_session_holds_ambient_listeners() {
        let session = session("<p>x</p>");
        let listeners = session.listeners().clone();
        assert_eq!(listeners.total(), 3);

        drop(session);
        assert_eq!(listeners.total(), 0);
    }

    #[test]
    fn test_insert_markup_splits_text_at_caret() {
        let mut session = session("<p>hello</p>");
        let caret = caret_at(&session, &[0, 0], 2);
        session.handle_selection_change(caret);

        session.insert_markup("<b>X</b>");
        assert_eq!(session.markup(), "<p>he<b>X</b>llo</p>");
        assert_eq!(session.host().restored, 1);
    }

    #[test]
    fn test_insert_markup_without_selection_appends_and_focuses() {
        let mut session = session("<p>a</p>");
        session.insert_markup("<p>b</p><p>c</p>");
        assert_eq!(session.markup(), "<p>a</p><p>b</p><p>c</p>");
        assert_eq!(session.host().focused, 1);
    }

    #[test]
    fn test_consecutive_inserts_follow_caret() {
        let mut session = session("<p>ab</p>");
        let caret = caret_at(&session, &[0, 0], 1);
        session.handle_selection_change(caret);

        session.insert_markup("<i>1</i>");
        session.insert_markup("<i>2</i>");
        assert_eq!(session.markup(), "<p>a<i>1</i><i>2</i>b</p>");
    }

    #[test]
    fn test_insert_at_end_of_text_keeps_order() {
        let mut session = session("<p>ab</p>");
        let caret = caret_at(&session, &[0, 0], 2);
        session.handle_selection_change(caret);

        session.insert_markup("<i>1</i><i>2</i>");
        assert_eq!(session.markup(), "<p>ab<i>1</i><i>2</i></p>");
    }

    #[test]
    fn test_tab_inserts_non_breaking_spaces() {
        let mut session = session("<p>ab</p>");
        let caret = caret_at(&session, &[0, 0], 1);
        session.handle_selection_change(caret);

        session.handle_tab_key();
        assert_eq!(session.markup(), "<p>a&nbsp;&nbsp;&nbsp;&nbsp;b</p>");
    }

    #[test]
    fn test_on_change_receives_markup() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut session = session("<p>a</p>");
        let sink = Rc::clone(&seen);
        session.set_on_change(move |markup| sink.borrow_mut().push(markup.to_string()));

        session.set_markup("");
        assert_eq!(*seen.borrow(), vec!["<p><br></p>".to_string()]);
        assert!(session.is_empty());
    }

    #[test]
    fn test_source_mode_round_trip() {
        let mut session = session("<p>a</p>");
        assert!(session.toggle_source_mode());
        assert_eq!(session.source_markup(), Some("<p>a</p>"));

        session.set_source_markup("<h1>b</h1>");
        assert_eq!(session.markup(), "<p>a</p>");
        assert!(!session.toggle_source_mode());
        assert_eq!(session.markup(), "<h1>b</h1>");
    }

    #[test]
    fn test_source_mode_ignores_structural_events() {
        let mut session = session("<p><img src=\"a.png\"></p>");
        session.toggle_source_mode();
        let img = session.document().node_at_path(&[0, 0]).unwrap();

        session.handle_click(img);
        assert!(session.selection_state().is_idle());
        assert_eq!(session.handle_context_menu(img), MenuDisposition::Native);
    }
}
