//! # Table Mutation Engine
//!
//! Structural edits applied straight to the live tree. The tree may have
//! drifted since the selection was taken (typing, paste, undo), so every
//! action re-checks its preconditions and quietly skips rows that do not
//! have the shape it expects.
//!
//! Column actions address cells by index within their row. On irregular
//! tables that index may not line up visually from row to row.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::{EditableDocument, InlineStyle, NodeId};
use crate::selection::StructuralSelection;

/// Style given to every fresh cell.
pub const DEFAULT_CELL_STYLE: &str = "border: 1px solid #d1d5db; padding: 8px; min-width: 30px;";

const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%; margin: 1em 0; border: 1px solid #e5e7eb; table-layout: fixed;";

const ROW_SECTIONS: &[&str] = &["thead", "tbody", "tfoot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TableAction {
    RowAbove,
    RowBelow,
    ColumnLeft,
    ColumnRight,
    DeleteRow,
    DeleteColumn,
    DeleteTable,
}

impl TableAction {
    pub const ALL: [TableAction; 7] = [
        TableAction::RowAbove,
        TableAction::RowBelow,
        TableAction::ColumnLeft,
        TableAction::ColumnRight,
        TableAction::DeleteRow,
        TableAction::DeleteColumn,
        TableAction::DeleteTable,
    ];

    /// Host-facing action name, e.g. `"row-above"`.
    pub fn name(&self) -> &'static str {
        match self {
            TableAction::RowAbove => "row-above",
            TableAction::RowBelow => "row-below",
            TableAction::ColumnLeft => "col-left",
            TableAction::ColumnRight => "col-right",
            TableAction::DeleteRow => "del-row",
            TableAction::DeleteColumn => "del-col",
            TableAction::DeleteTable => "del-table",
        }
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown table action `{0}`")]
pub struct UnknownTableAction(pub String);

impl FromStr for TableAction {
    type Err = UnknownTableAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableAction::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| UnknownTableAction(s.to_string()))
    }
}

impl TryFrom<String> for TableAction {
    type Error = UnknownTableAction;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TableAction> for String {
    fn from(action: TableAction) -> Self {
        action.name().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOutcome {
    /// A precondition did not hold; the tree is untouched.
    Skipped,
    Applied { table_removed: bool },
}

impl TableOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TableOutcome::Applied { .. })
    }
}

// ============ Structure queries ============

/// Rows of `table` in document order: rows that are direct children and rows
/// inside its `thead`, `tbody` and `tfoot` sections. Nested tables are not
/// descended into.
pub fn rows(doc: &EditableDocument, table: NodeId) -> Vec<NodeId> {
    let mut rows = Vec::new();
    for child in doc.element_children(table) {
        if doc.is_element_with_tag(child, "tr") {
            rows.push(child);
        } else if doc.tag(child).is_some_and(|tag| ROW_SECTIONS.contains(&tag)) {
            rows.extend(
                doc.element_children(child)
                    .into_iter()
                    .filter(|&row| doc.is_element_with_tag(row, "tr")),
            );
        }
    }
    rows
}

/// `td` and `th` children of a row.
pub fn cells(doc: &EditableDocument, row: NodeId) -> Vec<NodeId> {
    doc.element_children(row)
        .into_iter()
        .filter(|&cell| matches!(doc.tag(cell), Some("td" | "th")))
        .collect()
}

/// Rows outside `thead` and `tfoot` make up the table body.
fn is_body_row(doc: &EditableDocument, row: NodeId) -> bool {
    doc.get(row)
        .and_then(|node| node.parent)
        .and_then(|parent| doc.tag(parent))
        .is_none_or(|tag| !matches!(tag, "thead" | "tfoot"))
}

/// Position of a cell among its row's cells.
pub fn column_index(doc: &EditableDocument, cell: NodeId) -> Option<usize> {
    let row = doc.get(cell)?.parent?;
    cells(doc, row).iter().position(|&c| c == cell)
}

// ============ Construction ============

fn fresh_cell(doc: &mut EditableDocument, cell_style: &InlineStyle) -> NodeId {
    let cell = doc.create_element("td", &[("style", &cell_style.to_css())]);
    let br = doc.create_element("br", &[]);
    doc.append_child(cell, br);
    cell
}

/// Builds a detached `rows` × `cols` table followed by an empty paragraph so
/// the caret has somewhere to go after it. Returns the top-level nodes in
/// order. Zero dimensions are raised to one.
pub fn build_table(
    doc: &mut EditableDocument,
    rows: usize,
    cols: usize,
    cell_style: &str,
) -> Vec<NodeId> {
    let (rows, cols) = (rows.max(1), cols.max(1));
    let mut style = InlineStyle::parse(cell_style);
    style.set("position", "relative");
    style.set("width", &format!("{}%", 100.0 / cols as f64));

    let table = doc.create_element("table", &[("style", TABLE_STYLE)]);
    let body = doc.create_element("tbody", &[]);
    doc.append_child(table, body);
    for _ in 0..rows {
        let row = doc.create_element("tr", &[]);
        for _ in 0..cols {
            let cell = fresh_cell(doc, &style);
            doc.append_child(row, cell);
        }
        doc.append_child(body, row);
    }

    let paragraph = doc.create_element("p", &[]);
    let br = doc.create_element("br", &[]);
    doc.append_child(paragraph, br);
    vec![table, paragraph]
}

// ============ Mutations ============

/// Applies `action` to the selected table at the active cell.
///
/// Skipped unless a table is selected and attached, the active cell is
/// attached, and the cell sits in a row.
pub fn apply(
    doc: &mut EditableDocument,
    selection: &mut StructuralSelection,
    action: TableAction,
    cell_style: &str,
) -> TableOutcome {
    let Some(table) = selection
        .selected_table()
        .and_then(|table| doc.attached(table))
        .filter(|&table| doc.is_element_with_tag(table, "table"))
    else {
        return TableOutcome::Skipped;
    };
    let Some(cell) = selection.active_cell().and_then(|cell| doc.attached(cell)) else {
        return TableOutcome::Skipped;
    };
    let Some(row) = doc.closest(cell, &["tr"]) else {
        return TableOutcome::Skipped;
    };
    let Some(col) = column_index(doc, cell) else {
        return TableOutcome::Skipped;
    };

    log::debug!("table action {action} at row {row}, column {col}");
    let cell_style = InlineStyle::parse(cell_style);

    let table_removed = match action {
        TableAction::RowAbove | TableAction::RowBelow => {
            insert_row(doc, row, &cell_style, action == TableAction::RowBelow);
            false
        }
        TableAction::ColumnLeft | TableAction::ColumnRight => {
            insert_column(doc, table, col, &cell_style, action == TableAction::ColumnRight);
            false
        }
        TableAction::DeleteRow => {
            let was_body_row = is_body_row(doc, row);
            doc.remove_node(row);
            let remaining = rows(doc, table);
            remaining.is_empty()
                || (was_body_row && !remaining.iter().any(|&r| is_body_row(doc, r)))
        }
        TableAction::DeleteColumn => {
            for row in rows(doc, table) {
                if let Some(&target) = cells(doc, row).get(col) {
                    doc.remove_node(target);
                }
            }
            rows(doc, table)
                .first()
                .is_none_or(|&first| cells(doc, first).is_empty())
        }
        TableAction::DeleteTable => true,
    };

    if table_removed {
        log::debug!("table {table} removed");
        doc.remove_node(table);
        selection.clear();
    } else if !selection.active_cell().is_some_and(|c| doc.is_attached(c)) {
        selection.set_active_cell(None);
    }
    TableOutcome::Applied { table_removed }
}

fn insert_row(doc: &mut EditableDocument, row: NodeId, cell_style: &InlineStyle, below: bool) {
    let count = cells(doc, row).len();
    let Some(new_row) = doc.shallow_clone(row) else {
        return;
    };
    for _ in 0..count {
        let cell = fresh_cell(doc, cell_style);
        doc.append_child(new_row, cell);
    }
    if below {
        doc.insert_after(row, new_row);
    } else {
        doc.insert_before(row, new_row);
    }
}

fn insert_column(
    doc: &mut EditableDocument,
    table: NodeId,
    col: usize,
    cell_style: &InlineStyle,
    right: bool,
) {
    for row in rows(doc, table) {
        let Some(&anchor) = cells(doc, row).get(col) else {
            continue;
        };
        let cell = fresh_cell(doc, cell_style);
        if right {
            doc.insert_after(anchor, cell);
        } else {
            doc.insert_before(anchor, cell);
        }
    }
}
