//! # Drag-Resize Controller
//!
//! One controller per drag kind, each `Idle → Dragging → Idle`. While
//! dragging, the session holds document-level pointer subscriptions; ending
//! the session drops them, so no listener survives a drag however it ends.

use serde::Serialize;

use crate::dom::{EditableDocument, NodeRef};
use crate::events::{ListenerTarget, Listeners, Subscription};

pub const NODE_MIN_WIDTH: f64 = 50.0;
pub const COLUMN_MIN_WIDTH: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragKind {
    /// The selected image or table, from the corner handle.
    Node,
    /// A single cell, from a column rail.
    Column,
}

impl DragKind {
    pub fn default_floor(self) -> f64 {
        match self {
            DragKind::Node => NODE_MIN_WIDTH,
            DragKind::Column => COLUMN_MIN_WIDTH,
        }
    }
}

/// Width after dragging from `start_x` to `x`, never below `floor`.
pub fn dragged_width(start_width: f64, start_x: f64, x: f64, floor: f64) -> f64 {
    (start_width + (x - start_x)).max(floor)
}

#[derive(Debug)]
pub struct DragSession {
    pub start_x: f64,
    pub start_width: f64,
    pub target: NodeRef,
    /// Inline `width` before the drag, put back on cancel.
    original_width: Option<String>,
    _subscriptions: [Subscription; 2],
}

#[derive(Debug)]
pub struct DragController {
    kind: DragKind,
    floor: f64,
    session: Option<DragSession>,
}

impl DragController {
    pub fn new(kind: DragKind, floor: f64) -> Self {
        Self {
            kind,
            floor,
            session: None,
        }
    }

    pub fn kind(&self) -> DragKind {
        self.kind
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Starts dragging `target` from pointer position `start_x`. Refused while
    /// this controller is already dragging or if the target is detached.
    pub fn start(
        &mut self,
        doc: &EditableDocument,
        listeners: &Listeners,
        target: NodeRef,
        start_x: f64,
        start_width: f64,
    ) -> bool {
        if self.session.is_some() {
            return false;
        }
        let Some(id) = doc.attached(target) else {
            return false;
        };
        log::debug!("{:?} resize started on {id} at width {start_width}", self.kind);
        self.session = Some(DragSession {
            start_x,
            start_width,
            target,
            original_width: doc.style(id).get("width").map(str::to_string),
            _subscriptions: [
                listeners.subscribe(ListenerTarget::DocumentPointerMove),
                listeners.subscribe(ListenerTarget::DocumentPointerUp),
            ],
        });
        true
    }

    /// Writes the dragged width to the target and returns it. A target that
    /// has left the tree ends the session instead.
    pub fn pointer_move(&mut self, doc: &mut EditableDocument, x: f64) -> Option<f64> {
        let (target, start_x, start_width) = self
            .session
            .as_ref()
            .map(|s| (s.target, s.start_x, s.start_width))?;
        let Some(id) = doc.attached(target) else {
            self.end();
            return None;
        };
        let width = dragged_width(start_width, start_x, x, self.floor);
        doc.set_style_property(id, "width", &format!("{width}px"));
        Some(width)
    }

    /// Ends the session, releasing its listeners. Returns whether one was active.
    pub fn end(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                log::debug!("{:?} resize ended on {:?}", self.kind, session.target);
                true
            }
            None => false,
        }
    }

    /// Ends the session and puts the target's width back as it was.
    pub fn cancel(&mut self, doc: &mut EditableDocument) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        if let Some(id) = doc.attached(session.target) {
            match &session.original_width {
                Some(width) => doc.set_style_property(id, "width", width),
                None => doc.remove_style_property(id, "width"),
            }
        }
        log::debug!("{:?} resize cancelled", self.kind);
        true
    }
}
