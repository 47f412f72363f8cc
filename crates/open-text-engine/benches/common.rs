// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use open_text_engine::{
    EditableDocument, EditingHost, EditorSession, FormatCommand, GridLayout, SessionOptions,
    TextRange,
};

/// Host with no native editing behind it.
pub struct NullHost;

impl EditingHost for NullHost {
    fn exec_command(
        &mut self,
        _doc: &mut EditableDocument,
        _command: &FormatCommand,
        _value: Option<&str>,
    ) -> bool {
        false
    }

    fn query_command_state(&self, _command: &FormatCommand) -> bool {
        false
    }

    fn query_command_value(&self, _command: &FormatCommand) -> Option<String> {
        None
    }

    fn restore_selection(&mut self, _range: &TextRange) {}

    fn focus(&mut self) {}
}

#[allow(dead_code)]
pub type BenchSession = EditorSession<NullHost, GridLayout>;

#[allow(dead_code)]
pub fn generate_table(rows: usize, cols: usize) -> String {
    let mut markup = String::from("<table><tbody>");
    for r in 0..rows {
        markup.push_str("<tr>");
        for c in 0..cols {
            markup.push_str(&format!("<td>cell {r}.{c}</td>"));
        }
        markup.push_str("</tr>");
    }
    markup.push_str("</tbody></table>");
    markup
}

/// Paragraphs with a table every few blocks, for geometry over long documents.
#[allow(dead_code)]
pub fn generate_report(sections: usize) -> String {
    let mut markup = String::new();
    for section in 0..sections {
        markup.push_str(&format!("<h2>Section {section}</h2>"));
        markup.push_str("<p>Some paragraph content with <b>bold</b> and <i>italic</i> text.</p>");
        if section % 3 == 0 {
            markup.push_str(&generate_table(4, 4));
        }
    }
    markup
}

#[allow(dead_code)]
pub fn session_with(markup: &str) -> BenchSession {
    let mut session = EditorSession::new(NullHost, GridLayout::default(), SessionOptions::default());
    session.set_markup(markup);
    session
}
