//! Arena-backed mutable XML tree
//!
//! The tree is the single source of truth for a loaded document. Nodes are
//! never freed while the tree lives; detaching a node only unlinks it from its
//! parent, so a `NodeId` held by a domain object stays valid after removal.

/// Handle to a node inside an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Namespace-qualified element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            prefix: None,
            local: local.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    /// Serialized form: `prefix:local` or `local`.
    pub fn serialized(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.clone(),
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    pub name: QualifiedName,
    pub value: String,
}

/// Namespace declaration carried by an element (`xmlns` / `xmlns:p`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        name: QualifiedName,
        attributes: Vec<XmlAttribute>,
        namespaces: Vec<NamespaceDecl>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Ordered, attributed tree with stable node handles.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl XmlTree {
    /// Create a tree holding a single root element.
    pub fn new(root: QualifiedName) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.create_element(root);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a detached element.
    pub fn create_element(&mut self, name: QualifiedName) -> NodeId {
        self.push(NodeKind::Element {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        })
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.index()].kind
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Element { .. })
    }

    pub fn name(&self, node: NodeId) -> Option<&QualifiedName> {
        match self.kind(node) {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => None,
        }
    }

    /// Local name of an element, empty for text nodes.
    pub fn local_name(&self, node: NodeId) -> &str {
        self.name(node).map(|n| n.local.as_str()).unwrap_or("")
    }

    pub fn namespace(&self, node: NodeId) -> Option<&str> {
        self.name(node).and_then(|n| n.namespace.as_deref())
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    /// Child elements with the given local name, in document order.
    pub fn child_elements<'a>(
        &'a self,
        node: NodeId,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(node)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c) && self.local_name(c) == local)
    }

    pub fn first_child_element(&self, node: NodeId, local: &str) -> Option<NodeId> {
        self.child_elements(node, local).next()
    }

    /// All element descendants of `node` in document order (excluding `node`).
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            if self.is_element(n) {
                out.push(n);
                stack.extend(self.children(n).iter().rev().copied());
            }
        }
        out
    }

    /// True when the node can be reached from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    pub fn attributes(&self, node: NodeId) -> &[XmlAttribute] {
        match self.kind(node) {
            NodeKind::Element { attributes, .. } => attributes,
            NodeKind::Text(_) => &[],
        }
    }

    pub fn namespace_decls(&self, node: NodeId) -> &[NamespaceDecl] {
        match self.kind(node) {
            NodeKind::Element { namespaces, .. } => namespaces,
            NodeKind::Text(_) => &[],
        }
    }

    /// Value of an un-namespaced attribute.
    pub fn attribute(&self, node: NodeId, local: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespaced attribute.
    pub fn attribute_ns(&self, node: NodeId, namespace: &str, local: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|a| a.name.namespace.as_deref() == Some(namespace) && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Set an un-namespaced attribute, keeping its position if it exists.
    pub fn set_attribute(&mut self, node: NodeId, local: &str, value: &str) {
        self.set_attribute_qualified(node, QualifiedName::new(None, local), value);
    }

    /// Set a namespaced attribute. The prefix is only used when the attribute
    /// does not exist yet.
    pub fn set_attribute_ns(
        &mut self,
        node: NodeId,
        namespace: &str,
        prefix: &str,
        local: &str,
        value: &str,
    ) {
        let name = QualifiedName::new(Some(namespace), local).with_prefix(Some(prefix));
        self.set_attribute_qualified(node, name, value);
    }

    fn set_attribute_qualified(&mut self, node: NodeId, name: QualifiedName, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.index()].kind {
            match attributes
                .iter_mut()
                .find(|a| a.name.namespace == name.namespace && a.name.local == name.local)
            {
                Some(existing) => existing.value = value.to_string(),
                None => attributes.push(XmlAttribute {
                    name,
                    value: value.to_string(),
                }),
            }
        }
    }

    /// Remove an un-namespaced attribute, returning its old value.
    pub fn remove_attribute(&mut self, node: NodeId, local: &str) -> Option<String> {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.index()].kind {
            let pos = attributes
                .iter()
                .position(|a| a.name.namespace.is_none() && a.name.local == local)?;
            return Some(attributes.remove(pos).value);
        }
        None
    }

    pub fn add_namespace_decl(&mut self, node: NodeId, prefix: Option<&str>, uri: &str) {
        if let NodeKind::Element { namespaces, .. } = &mut self.nodes[node.index()].kind {
            namespaces.push(NamespaceDecl {
                prefix: prefix.map(str::to_string),
                uri: uri.to_string(),
            });
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `child` at `index` among `parent`'s children (clamped).
    pub fn insert_child_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `child` just before the first child element of `parent` named
    /// `before`, or append when there is none.
    pub fn insert_before_first(&mut self, parent: NodeId, before: &[&str], child: NodeId) {
        let pos = self
            .children(parent)
            .iter()
            .position(|&c| self.is_element(c) && before.contains(&self.local_name(c)));
        match pos {
            Some(index) => self.insert_child_at(parent, index, child),
            None => self.append_child(parent, child),
        }
    }

    /// Unlink a node from its parent. Returns false when it was not attached.
    pub fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes[node.index()].parent.take() else {
            return false;
        };
        self.nodes[parent.index()].children.retain(|&c| c != node);
        true
    }

    /// Create an element with un-namespaced attributes and append it.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: QualifiedName,
        attributes: &[(&str, &str)],
    ) -> NodeId {
        let node = self.create_element(name);
        for (k, v) in attributes {
            self.set_attribute(node, k, v);
        }
        self.append_child(parent, node);
        node
    }

    /// Qualified name for a new child of `parent` in the parent's namespace.
    pub fn name_in_scope_of(&self, parent: NodeId, local: &str) -> QualifiedName {
        let prefix = self.name(parent).and_then(|n| n.prefix.as_deref());
        QualifiedName::new(self.namespace(parent), local).with_prefix(prefix)
    }
}
