//! Float and centering styles for the selected image or table.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::dom::{EditableDocument, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    /// Back in the text flow.
    Inline,
}

impl Alignment {
    pub fn name(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Inline => "inline",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown alignment `{0}`")]
pub struct UnknownAlignment(pub String);

impl FromStr for Alignment {
    type Err = UnknownAlignment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Alignment::Left),
            "center" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            "inline" => Ok(Alignment::Inline),
            other => Err(UnknownAlignment(other.to_string())),
        }
    }
}

/// Rewrites the layout styles of `node` for `alignment`.
///
/// `display`, `float` and `margin` are reset first so switching alignment
/// never leaves a stale float or margin behind.
pub fn apply(doc: &mut EditableDocument, node: NodeId, alignment: Alignment) {
    for property in ["display", "float", "margin", "margin-left", "margin-right"] {
        doc.remove_style_property(node, property);
    }
    doc.set_style_property(node, "outline", "none");

    match alignment {
        Alignment::Left => {
            doc.set_style_property(node, "float", "left");
            doc.set_style_property(node, "margin", "0 1rem 1rem 0");
        }
        Alignment::Right => {
            doc.set_style_property(node, "float", "right");
            doc.set_style_property(node, "margin", "0 0 1rem 1rem");
        }
        Alignment::Center => {
            doc.set_style_property(node, "display", "block");
            doc.set_style_property(node, "margin-left", "auto");
            doc.set_style_property(node, "margin-right", "auto");
        }
        Alignment::Inline => doc.set_style_property(node, "display", "inline-block"),
    }
}
