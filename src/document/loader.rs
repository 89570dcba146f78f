//! Loading EDMX text into an [`XmlTree`]

use std::path::Path;

use encoding_rs::{UTF_8, WINDOWS_1252};

use super::tree::{QualifiedName, XmlTree};
use super::{EdmxDocument, EdmxVersion};
use crate::error::{EdmxError, Result};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Read a file as a string. Byte order marks select UTF-8/UTF-16; files
/// without one that are not valid UTF-8 fall back to Windows-1252.
fn read_file_with_encoding_fallback(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;

    let (decoded, _, had_errors) = UTF_8.decode(&bytes);
    if !had_errors {
        return Ok(decoded.into_owned());
    }

    let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
    if had_errors {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "File contains invalid characters",
        ))
    } else {
        Ok(decoded.into_owned())
    }
}

/// Load and parse an EDMX file.
pub fn load_file(path: &Path) -> Result<EdmxDocument> {
    let text = read_file_with_encoding_fallback(path).map_err(|source| EdmxError::DocumentRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text)
}

/// Parse EDMX text, resolving the dialect from the root namespace.
pub fn parse_document(text: &str) -> Result<EdmxDocument> {
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();

    let root_ns = root.tag_name().namespace().unwrap_or("");
    let version =
        EdmxVersion::from_root_namespace(root_ns).ok_or_else(|| EdmxError::UnknownDialect {
            namespace: root_ns.to_string(),
        })?;

    let mut tree = XmlTree::new(element_name(&root));
    let tree_root = tree.root();
    copy_element_details(&root, &mut tree, tree_root, None);
    copy_children(&root, &mut tree, tree_root);

    Ok(EdmxDocument { tree, version })
}

/// Element names keep the prefix they were written with. A URI bound both
/// as the default namespace and to a prefix cannot be told apart otherwise.
fn element_name(node: &roxmltree::Node) -> QualifiedName {
    let ns = node.tag_name().namespace();
    let prefix = match start_tag_name(node) {
        Some(written) => written.split_once(':').map(|(prefix, _)| prefix),
        None => ns.and_then(|uri| node.lookup_prefix(uri)),
    };
    QualifiedName::new(ns, node.tag_name().name()).with_prefix(prefix)
}

/// The literal qualified name in the element's start tag.
fn start_tag_name<'a, 'input>(node: &roxmltree::Node<'a, 'input>) -> Option<&'input str> {
    let source = node.document().input_text().get(node.range())?;
    let tag = source.strip_prefix('<')?;
    let end = tag.find(|c: char| c.is_whitespace() || c == '/' || c == '>')?;
    Some(&tag[..end])
}

/// Prefix for a namespaced attribute. Unprefixed attributes are never in the
/// default namespace, so only named bindings qualify.
fn attribute_prefix<'a>(node: &roxmltree::Node<'a, '_>, uri: &str) -> Option<&'a str> {
    if uri == XML_NS {
        return Some("xml");
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name())
}

/// Copy attributes and the namespace declarations introduced by this element.
fn copy_element_details(
    node: &roxmltree::Node,
    tree: &mut XmlTree,
    target: super::NodeId,
    parent: Option<&roxmltree::Node>,
) {
    for ns in node.namespaces() {
        let inherited = parent.is_some_and(|p| {
            p.namespaces()
                .any(|pn| pn.name() == ns.name() && pn.uri() == ns.uri())
        });
        if !inherited && ns.uri() != XML_NS {
            tree.add_namespace_decl(target, ns.name(), ns.uri());
        }
    }

    for attr in node.attributes() {
        match attr.namespace() {
            Some(uri) => {
                let prefix = attribute_prefix(node, uri).unwrap_or("");
                tree.set_attribute_ns(target, uri, prefix, attr.name(), attr.value());
            }
            None => tree.set_attribute(target, attr.name(), attr.value()),
        }
    }
}

fn copy_children(source: &roxmltree::Node, tree: &mut XmlTree, target: super::NodeId) {
    for child in source.children() {
        if child.is_element() {
            let node = tree.create_element(element_name(&child));
            copy_element_details(&child, tree, node, Some(source));
            tree.append_child(target, node);
            copy_children(&child, tree, node);
        } else if child.is_text() {
            let text = child.text().unwrap_or("");
            // Indentation is regenerated on write
            if !text.trim().is_empty() {
                let node = tree.create_text(text);
                tree.append_child(target, node);
            }
        }
    }
}
