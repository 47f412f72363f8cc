//! Formatting commands and the toolbar state derived from them.
//!
//! The engine never implements a formatting command itself. It restores the
//! saved selection and hands the command to the [`EditingHost`], then reads
//! back which formats are active at the caret.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::dom::EditableDocument;
use crate::selection::TextRange;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    Subscript,
    Superscript,
    JustifyLeft,
    JustifyCenter,
    JustifyRight,
    JustifyFull,
    InsertUnorderedList,
    InsertOrderedList,
    Indent,
    Outdent,
    Undo,
    Redo,
    FormatBlock,
    FontName,
    FontSize,
    ForeColor,
    HiliteColor,
    CreateLink,
    InsertHorizontalRule,
    RemoveFormat,
    /// Any other command name the host understands.
    Other(String),
}

impl FormatCommand {
    const NAMED: [FormatCommand; 24] = [
        FormatCommand::Bold,
        FormatCommand::Italic,
        FormatCommand::Underline,
        FormatCommand::StrikeThrough,
        FormatCommand::Subscript,
        FormatCommand::Superscript,
        FormatCommand::JustifyLeft,
        FormatCommand::JustifyCenter,
        FormatCommand::JustifyRight,
        FormatCommand::JustifyFull,
        FormatCommand::InsertUnorderedList,
        FormatCommand::InsertOrderedList,
        FormatCommand::Indent,
        FormatCommand::Outdent,
        FormatCommand::Undo,
        FormatCommand::Redo,
        FormatCommand::FormatBlock,
        FormatCommand::FontName,
        FormatCommand::FontSize,
        FormatCommand::ForeColor,
        FormatCommand::HiliteColor,
        FormatCommand::CreateLink,
        FormatCommand::InsertHorizontalRule,
        FormatCommand::RemoveFormat,
    ];

    pub fn name(&self) -> &str {
        match self {
            FormatCommand::Bold => "bold",
            FormatCommand::Italic => "italic",
            FormatCommand::Underline => "underline",
            FormatCommand::StrikeThrough => "strikeThrough",
            FormatCommand::Subscript => "subscript",
            FormatCommand::Superscript => "superscript",
            FormatCommand::JustifyLeft => "justifyLeft",
            FormatCommand::JustifyCenter => "justifyCenter",
            FormatCommand::JustifyRight => "justifyRight",
            FormatCommand::JustifyFull => "justifyFull",
            FormatCommand::InsertUnorderedList => "insertUnorderedList",
            FormatCommand::InsertOrderedList => "insertOrderedList",
            FormatCommand::Indent => "indent",
            FormatCommand::Outdent => "outdent",
            FormatCommand::Undo => "undo",
            FormatCommand::Redo => "redo",
            FormatCommand::FormatBlock => "formatBlock",
            FormatCommand::FontName => "fontName",
            FormatCommand::FontSize => "fontSize",
            FormatCommand::ForeColor => "foreColor",
            FormatCommand::HiliteColor => "hiliteColor",
            FormatCommand::CreateLink => "createLink",
            FormatCommand::InsertHorizontalRule => "insertHorizontalRule",
            FormatCommand::RemoveFormat => "removeFormat",
            FormatCommand::Other(name) => name,
        }
    }
}

impl fmt::Display for FormatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown format command `{0}`")]
pub struct UnknownFormatCommand(pub String);

impl FromStr for FormatCommand {
    type Err = UnknownFormatCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(UnknownFormatCommand(s.to_string()));
        }
        Ok(FormatCommand::NAMED
            .into_iter()
            .find(|command| command.name().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| FormatCommand::Other(name.to_string())))
    }
}

/// Native editing facilities of the host: command dispatch, command state
/// queries and the native text selection.
pub trait EditingHost {
    /// Runs a formatting command against the document at the native selection.
    fn exec_command(
        &mut self,
        doc: &mut EditableDocument,
        command: &FormatCommand,
        value: Option<&str>,
    ) -> bool;

    /// Whether the format is active at the caret, like `queryCommandState`.
    fn query_command_state(&self, command: &FormatCommand) -> bool;

    /// Current value of a valued format at the caret, like `queryCommandValue`.
    fn query_command_value(&self, command: &FormatCommand) -> Option<String>;

    /// Makes `range` the native selection again.
    fn restore_selection(&mut self, range: &TextRange);

    fn focus(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFormats {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub subscript: bool,
    pub superscript: bool,
    pub justify_left: bool,
    pub justify_center: bool,
    pub justify_right: bool,
    pub justify_full: bool,
    pub unordered_list: bool,
    pub ordered_list: bool,
}

impl ActiveFormats {
    pub fn query(host: &dyn EditingHost) -> Self {
        let on = |command: FormatCommand| host.query_command_state(&command);
        Self {
            bold: on(FormatCommand::Bold),
            italic: on(FormatCommand::Italic),
            underline: on(FormatCommand::Underline),
            strikethrough: on(FormatCommand::StrikeThrough),
            subscript: on(FormatCommand::Subscript),
            superscript: on(FormatCommand::Superscript),
            justify_left: on(FormatCommand::JustifyLeft),
            justify_center: on(FormatCommand::JustifyCenter),
            justify_right: on(FormatCommand::JustifyRight),
            justify_full: on(FormatCommand::JustifyFull),
            unordered_list: on(FormatCommand::InsertUnorderedList),
            ordered_list: on(FormatCommand::InsertOrderedList),
        }
    }
}

pub const DEFAULT_FONT_SIZE_LABEL: &str = "16px";

/// Pixel labels for the native `fontSize` values 1 through 7.
const FONT_SIZE_LABELS: [&str; 7] = ["10px", "13px", "16px", "18px", "24px", "32px", "48px"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatLabels {
    pub heading: &'static str,
    pub font: &'static str,
    pub font_size: &'static str,
}

impl Default for FormatLabels {
    fn default() -> Self {
        Self {
            heading: "Normal",
            font: "Sans Serif",
            font_size: DEFAULT_FONT_SIZE_LABEL,
        }
    }
}

pub fn heading_label(tag: Option<&str>) -> &'static str {
    match tag {
        Some("h1") => "Heading 1",
        Some("h2") => "Heading 2",
        Some("h3") => "Heading 3",
        Some("blockquote") => "Quote",
        _ => "Normal",
    }
}

pub fn font_size_label(value: Option<&str>) -> &'static str {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .and_then(|size| size.checked_sub(1))
        .and_then(|index| FONT_SIZE_LABELS.get(index).copied())
        .unwrap_or(DEFAULT_FONT_SIZE_LABEL)
}

pub fn font_label(face: &str) -> &'static str {
    if face.contains("Serif") {
        "Serif"
    } else if face.contains("Mono") {
        "Monospace"
    } else {
        "Sans Serif"
    }
}

/// Toolbar state at the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FormatState {
    pub active: ActiveFormats,
    pub labels: FormatLabels,
}

impl FormatState {
    /// Re-reads everything from the host. Labels that depend on the caret are
    /// only refreshed while `caret` is inside the document.
    pub fn recompute(
        &mut self,
        doc: &EditableDocument,
        host: &dyn EditingHost,
        caret: Option<TextRange>,
    ) {
        self.active = ActiveFormats::query(host);
        let Some(container) = caret.and_then(|range| range.container(doc)) else {
            return;
        };
        self.labels.font_size =
            font_size_label(host.query_command_value(&FormatCommand::FontSize).as_deref());
        self.labels.font = font_label(
            host.query_command_value(&FormatCommand::FontName)
                .as_deref()
                .unwrap_or_default(),
        );
        self.labels.heading = heading_label(doc.tag(container));
    }
}
