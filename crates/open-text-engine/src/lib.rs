pub mod align;
pub mod dom;
pub mod events;
pub mod formats;
pub mod geometry;
pub mod layout;
pub mod resize;
pub mod selection;
pub mod session;
pub mod table;

// Re-export key types for easier usage
pub use align::{Alignment, UnknownAlignment};
pub use dom::{EditableDocument, InlineStyle, NodeId, NodeRef};
pub use events::{DeferredTask, ListenerTarget, Listeners, Subscription};
pub use formats::{
    ActiveFormats, EditingHost, FormatCommand, FormatLabels, FormatState, UnknownFormatCommand,
};
pub use geometry::{ColumnResizeHandle, LayoutProvider, OverlayGeometry, OverlayRect, Rect};
pub use layout::GridLayout;
pub use resize::{DragKind, dragged_width};
pub use selection::{
    Boundary, DragActivity, SelectedNode, SelectionState, StructuralKind, TextRange,
};
pub use session::{EditorMode, EditorSession, FloatingAction, MenuDisposition, SessionOptions};
pub use table::{TableAction, TableOutcome, UnknownTableAction};
