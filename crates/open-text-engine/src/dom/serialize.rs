use super::{EditableDocument, NodeData, NodeId};

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

impl EditableDocument {
    /// Serialized markup of everything inside the editable root, the
    /// equivalent of the container's `innerHTML`.
    pub fn markup(&self) -> String {
        self.inner_html(self.root())
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut output = String::new();
        if let Some(node) = self.get(id) {
            for &child in &node.children {
                self.write_outer_html(child, &mut output);
            }
        }
        output
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.write_outer_html(id, &mut output);
        output
    }

    fn write_outer_html(&self, id: NodeId, writer: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Root => {
                for &child in &node.children {
                    self.write_outer_html(child, writer);
                }
            }
            NodeData::Comment(text) => {
                writer.push_str("<!--");
                writer.push_str(text);
                writer.push_str("-->");
            }
            NodeData::Text(text) => {
                let escaped = html_escape::encode_text(text);
                writer.push_str(&escaped.replace('\u{a0}', "&nbsp;"));
            }
            NodeData::Element(data) => {
                writer.push('<');
                writer.push_str(data.tag());
                for attr in &data.attrs {
                    writer.push(' ');
                    writer.push_str(&attr.name.local);
                    writer.push_str("=\"");
                    html_escape::encode_double_quoted_attribute_to_string(&attr.value, writer);
                    writer.push('"');
                }
                writer.push('>');

                if VOID_ELEMENTS.contains(&data.tag()) {
                    return;
                }
                for &child in &node.children {
                    self.write_outer_html(child, writer);
                }
                writer.push_str("</");
                writer.push_str(data.tag());
                writer.push('>');
            }
        }
    }
}
