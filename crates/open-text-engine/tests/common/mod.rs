//! Shared helpers for driving an `EditorSession` end to end.
#![allow(dead_code)]

use open_text_engine::{
    Boundary, EditableDocument, EditingHost, EditorSession, FormatCommand, GridLayout, NodeId,
    SessionOptions, TextRange, table,
};

/// Host that records what the engine asked of it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub commands: Vec<(String, Option<String>)>,
    pub restored: Vec<TextRange>,
    pub focus_count: usize,
    pub active: Vec<FormatCommand>,
}

impl EditingHost for RecordingHost {
    fn exec_command(
        &mut self,
        _doc: &mut EditableDocument,
        command: &FormatCommand,
        value: Option<&str>,
    ) -> bool {
        self.commands
            .push((command.to_string(), value.map(str::to_string)));
        true
    }

    fn query_command_state(&self, command: &FormatCommand) -> bool {
        self.active.contains(command)
    }

    fn query_command_value(&self, _command: &FormatCommand) -> Option<String> {
        None
    }

    fn restore_selection(&mut self, range: &TextRange) {
        self.restored.push(*range);
    }

    fn focus(&mut self) {
        self.focus_count += 1;
    }
}

pub type TestSession = EditorSession<RecordingHost, GridLayout>;

pub fn session(markup: &str) -> TestSession {
    let mut session = EditorSession::new(
        RecordingHost::default(),
        GridLayout::default(),
        SessionOptions::default(),
    );
    session.set_markup(markup);
    session
}

pub fn node(session: &TestSession, path: &[usize]) -> NodeId {
    session
        .document()
        .node_at_path(path)
        .unwrap_or_else(|| panic!("no node at {path:?}"))
}

pub fn caret(session: &TestSession, path: &[usize], offset: usize) -> TextRange {
    let doc = session.document();
    TextRange::collapsed(Boundary {
        node: doc.node_ref(node(session, path)).unwrap(),
        offset,
    })
}

/// A `rows` × `cols` table whose cells read `"{row}{col}"`.
pub fn grid(rows: usize, cols: usize) -> String {
    let body: String = (0..rows)
        .map(|r| {
            let cells: String = (0..cols).map(|c| format!("<td>{r}{c}</td>")).collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();
    format!("<table><tbody>{body}</tbody></table>")
}

/// Cell texts of the table at `path`, row by row.
pub fn cell_texts(session: &TestSession, path: &[usize]) -> Vec<Vec<String>> {
    let doc = session.document();
    let table = node(session, path);
    table::rows(doc, table)
        .into_iter()
        .map(|row| {
            table::cells(doc, row)
                .into_iter()
                .map(|cell| doc.text_content(cell))
                .collect()
        })
        .collect()
}
