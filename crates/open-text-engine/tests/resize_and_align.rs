mod common;

use common::{node, session};
use open_text_engine::{Alignment, ListenerTarget, OverlayRect};
use pretty_assertions::assert_eq;

const SIZED_IMAGE: &str = r#"<p><img src="a.png" style="width: 100px"></p>"#;
const SIZED_COLUMN: &str =
    r#"<table><tbody><tr><td style="width: 100px">a</td><td>b</td></tr></tbody></table>"#;

fn width_of(session: &common::TestSession, path: &[usize]) -> Option<String> {
    let doc = session.document();
    doc.style(node(session, path)).get("width").map(str::to_string)
}

#[test]
fn test_node_drag_clamps_and_moves_overlay() {
    let mut session = session(SIZED_IMAGE);
    session.handle_click(node(&session, &[0, 0]));
    assert_eq!(session.overlay().map(|o| o.width), Some(100.0));

    assert!(session.start_node_resize(500.0));
    assert_eq!(session.listeners().count(ListenerTarget::DocumentPointerMove), 1);
    assert_eq!(session.listeners().count(ListenerTarget::DocumentPointerUp), 1);

    session.handle_pointer_move(540.0);
    assert_eq!(width_of(&session, &[0, 0]).as_deref(), Some("140px"));
    assert_eq!(session.overlay().map(|o| o.width), Some(140.0));

    session.handle_pointer_move(0.0);
    assert_eq!(width_of(&session, &[0, 0]).as_deref(), Some("50px"));
    assert_eq!(
        session.overlay(),
        Some(OverlayRect {
            top: 0.0,
            left: 0.0,
            width: 50.0,
            height: 200.0,
        })
    );
}

#[test]
fn test_pointer_up_releases_document_listeners() {
    let mut session = session(SIZED_IMAGE);
    let changes = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = std::rc::Rc::clone(&changes);
    session.set_on_change(move |_| counter.set(counter.get() + 1));
    session.handle_click(node(&session, &[0, 0]));
    session.start_node_resize(100.0);
    session.handle_pointer_move(150.0);

    session.handle_pointer_up();
    assert!(!session.drag_activity().any());
    assert!(!session.listeners().is_listening(ListenerTarget::DocumentPointerMove));
    assert!(!session.listeners().is_listening(ListenerTarget::DocumentPointerUp));
    assert_eq!(session.listeners().total(), 3);
    assert_eq!(changes.get(), 1);

    // Moves after release do nothing.
    session.handle_pointer_move(900.0);
    assert_eq!(width_of(&session, &[0, 0]).as_deref(), Some("150px"));
}

#[test]
fn test_column_drag_clamps_to_column_floor() {
    let mut session = session(SIZED_COLUMN);
    session.handle_click(node(&session, &[0, 0, 0, 1]));
    let lefts: Vec<f64> = session.column_handles().iter().map(|h| h.left).collect();
    assert_eq!(lefts, vec![100.0, 500.0]);

    let rail = session.column_handles()[0].cell;
    assert!(session.start_column_resize(rail, 100.0));
    assert!(session.drag_activity().column);

    session.handle_pointer_move(-400.0);
    assert_eq!(width_of(&session, &[0, 0, 0, 0]).as_deref(), Some("20px"));
    assert_eq!(session.column_handles()[0].left, 20.0);
    session.handle_pointer_up();
}

#[test]
fn test_column_drag_keeps_active_cell_when_clicking_elsewhere() {
    let mut session = session(&format!("{SIZED_COLUMN}<p>after</p>"));
    session.handle_click(node(&session, &[0, 0, 0, 1]));
    let active = session.active_cell();
    let rail = session.column_handles()[0].cell;
    session.start_column_resize(rail, 100.0);

    session.handle_click(node(&session, &[1, 0]));
    assert_eq!(session.active_cell(), active);
    assert!(session.selected().is_some());
}

#[test]
fn test_only_one_drag_at_a_time() {
    let mut session = session(SIZED_COLUMN);
    session.handle_click(node(&session, &[0, 0, 0, 0]));
    let rail = session.column_handles()[0].cell;

    assert!(session.start_node_resize(10.0));
    assert!(!session.start_column_resize(rail, 100.0));
    assert!(!session.start_node_resize(10.0));
    session.handle_pointer_up();
    assert!(session.start_column_resize(rail, 100.0));
}

#[test]
fn test_escape_restores_starting_width() {
    let mut session = session(SIZED_COLUMN);
    session.handle_click(node(&session, &[0, 0, 0, 0]));
    let rail = session.column_handles()[0].cell;
    session.start_column_resize(rail, 100.0);
    session.handle_pointer_move(300.0);
    assert_eq!(width_of(&session, &[0, 0, 0, 0]).as_deref(), Some("300px"));

    assert!(session.handle_escape());
    assert_eq!(width_of(&session, &[0, 0, 0, 0]).as_deref(), Some("100px"));
    assert_eq!(session.column_handles()[0].left, 100.0);
    assert!(!session.drag_activity().any());
    assert!(!session.handle_escape());
}

#[test]
fn test_escape_removes_width_that_was_never_set() {
    let mut session = session(r#"<p><img src="a.png"></p>"#);
    session.handle_click(node(&session, &[0, 0]));
    session.start_node_resize(300.0);
    session.handle_pointer_move(250.0);
    assert_eq!(width_of(&session, &[0, 0]).as_deref(), Some("250px"));

    session.handle_escape();
    assert_eq!(width_of(&session, &[0, 0]), None);
}

#[test]
fn test_align_center_rewrites_float_styles() {
    let mut session = session(
        r#"<p><img src="a.png" style="width: 100px; float: left; margin: 0 1rem 1rem 0"></p>"#,
    );
    session.handle_click(node(&session, &[0, 0]));

    assert!(session.align_selected(Alignment::Center));
    assert_eq!(
        session.document().style(node(&session, &[0, 0])).to_css(),
        "width: 100px; outline: none; display: block; margin-left: auto; margin-right: auto;"
    );
    assert_eq!(session.pending_tasks(), 1);
    assert_eq!(session.run_deferred(), 1);
    assert!(session.overlay().is_some());
}

#[test]
fn test_align_without_selection_does_nothing() {
    let mut session = session(SIZED_IMAGE);
    let before = session.markup();

    assert!(!session.align_selected(Alignment::Right));
    assert_eq!(session.markup(), before);
    assert_eq!(session.pending_tasks(), 0);
}

#[test]
fn test_delete_selected_image() {
    let mut session = session(r#"<p>x<img src="a.png"></p>"#);
    session.handle_click(node(&session, &[0, 1]));

    assert!(session.delete_selected());
    assert_eq!(session.markup(), "<p>x</p>");
    assert!(session.selection_state().is_idle());
    assert!(!session.delete_selected());
}
