//! Serializing an [`XmlTree`] back to EDMX text

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::tree::{NodeId, NodeKind, XmlTree};
use crate::error::{EdmxError, Result};

/// Serialize the tree with an XML declaration and two-space indentation.
pub fn write_document(tree: &XmlTree) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(write_error)?;
    write_node(&mut writer, tree, tree.root())?;

    String::from_utf8(writer.into_inner()).map_err(|e| EdmxError::XmlWrite {
        message: e.to_string(),
    })
}

/// Serialize the tree and write it to `path`.
pub fn save_file(tree: &XmlTree, path: &Path) -> Result<()> {
    let xml = write_document(tree)?;
    std::fs::write(path, xml).map_err(|source| EdmxError::DocumentWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn write_error(err: std::io::Error) -> EdmxError {
    EdmxError::XmlWrite {
        message: err.to_string(),
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, tree: &XmlTree, node: NodeId) -> Result<()> {
    match tree.kind(node) {
        NodeKind::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text))).map_err(write_error)?;
        }
        NodeKind::Element {
            name,
            attributes,
            namespaces,
        } => {
            let tag = name.serialized();
            let mut start = BytesStart::new(tag.as_str());
            for attr in attributes {
                start.push_attribute((attr.name.serialized().as_str(), attr.value.as_str()));
            }
            for decl in namespaces {
                let key = match &decl.prefix {
                    Some(p) => format!("xmlns:{}", p),
                    None => "xmlns".to_string(),
                };
                start.push_attribute((key.as_str(), decl.uri.as_str()));
            }

            let children = tree.children(node);
            if children.is_empty() {
                writer.write_event(Event::Empty(start)).map_err(write_error)?;
            } else {
                writer.write_event(Event::Start(start)).map_err(write_error)?;
                for &child in children {
                    write_node(writer, tree, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(tag.as_str()))).map_err(write_error)?;
            }
        }
    }
    Ok(())
}
