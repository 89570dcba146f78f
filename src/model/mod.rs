//! The synchronized domain object graph over an EDMX document
//!
//! [`EdmxModel`] owns the backing [`XmlTree`] and hands out copyable typed
//! handles ([`EntityType`], [`Property`], ...). Objects are materialized on
//! first access through per-parent identity caches, so the same backing node
//! always yields the same handle. Cross-layer references are resolved lazily
//! and kept consistent through rename/removal notifications.
//!
//! The model is single-threaded: lazy materialization uses interior
//! mutability, so `EdmxModel` is `!Sync`. Callers must not mutate a
//! collection while iterating a list returned for it and then expect the
//! list to reflect the mutation; enumerations return snapshots.

mod associations;
mod cache;
mod common;
mod containers;
mod edit;
mod entities;
mod graph;
mod handles;
mod kinds;
mod mapping;
mod notify;
mod references;

use std::cell::{Cell, RefCell};
use std::path::Path;

use indexmap::IndexMap;
use tracing::trace;

pub use associations::{AssociationSpec, EndSpec, Multiplicity, ReferentialConstraint};
pub use cache::{IdentityCache, ScanState};
pub use common::CommonProperty;
pub use containers::{FunctionSpec, ParameterMode};
pub use entities::PropertySpec;
pub use handles::{
    AnyObject, Association, AssociationEnd, AssociationSet, AssociationSetEnd,
    AssociationSetMapping, ComplexType, Condition, DomainObject, EntitySet, EntitySetMapping,
    EntityType, EntityTypeMapping, Function, FunctionImport, FunctionImportMapping,
    MappingFragment, MappingOwner, NavigationProperty, Parameter, ParameterOwner, Property,
    PropertyOwner, ScalarMapping,
};
pub use kinds::{Layer, ObjectId, ObjectKind};
pub use mapping::{ColumnMember, ConditionValue, MappedColumnHolder, StoreSetMappings};
pub use notify::Notification;
pub use references::{DanglingReference, RefSlot, RemovalPolicy};

use crate::document::{self, EdmxDocument, EdmxVersion, NodeId, XmlTree};
use crate::error::Result;
use crate::util::{eq_ci, fold_key, split_qualified};
use graph::ObjectGraph;

/// An editable, self-consistent EDMX document.
#[derive(Debug)]
pub struct EdmxModel {
    tree: XmlTree,
    version: EdmxVersion,
    graph: RefCell<ObjectGraph>,
    /// Every reference slot has been resolved since the last mutation
    bound: Cell<bool>,
    storage_root: ObjectId,
    conceptual_root: ObjectId,
    mapping_root: ObjectId,
}

impl EdmxModel {
    /// Wrap a loaded document. Fails when a layer region is missing.
    pub fn new(document: EdmxDocument) -> Result<Self> {
        let regions = document.regions()?;
        let mut graph = ObjectGraph::default();
        let storage_root = graph.alloc(
            ObjectKind::Schema,
            Layer::Storage,
            regions.storage_schema,
            None,
        );
        let conceptual_root = graph.alloc(
            ObjectKind::Schema,
            Layer::Conceptual,
            regions.conceptual_schema,
            None,
        );
        let mapping_root = graph.alloc(
            ObjectKind::ContainerMapping,
            Layer::Mapping,
            regions.container_mapping,
            None,
        );

        Ok(Self {
            tree: document.tree,
            version: document.version,
            graph: RefCell::new(graph),
            bound: Cell::new(false),
            storage_root,
            conceptual_root,
            mapping_root,
        })
    }

    /// Parse EDMX text.
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(document::parse_document(text)?)
    }

    /// Load an EDMX file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let document = document::load_file(path.as_ref())?;
        Ok(Self::new(document)?)
    }

    /// An empty model with one conceptual namespace and its `.Store`
    /// storage namespace.
    pub fn empty(version: EdmxVersion, namespace: &str) -> Result<Self> {
        Self::new(EdmxDocument::empty(version, namespace))
    }

    /// Serialize the backing tree.
    pub fn to_xml_string(&self) -> Result<String> {
        document::write_document(&self.tree)
    }

    /// Write the backing tree to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        document::save_file(&self.tree, path.as_ref())?;
        Ok(())
    }

    pub fn version(&self) -> EdmxVersion {
        self.version
    }

    /// Read access to the backing tree.
    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    pub fn into_document(self) -> EdmxDocument {
        EdmxDocument {
            tree: self.tree,
            version: self.version,
        }
    }

    /// Number of objects materialized so far.
    pub fn materialized_count(&self) -> usize {
        self.graph.borrow().len()
    }

    /// Scan state of `parent`'s collection of `kind` children.
    pub fn scan_state<T: DomainObject>(&self, parent: T, kind: ObjectKind) -> ScanState {
        self.graph
            .borrow()
            .cache(parent.id(), kind)
            .map_or(ScanState::NotScanned, IdentityCache::state)
    }

    // ------------------------------------------------------------------
    // Generic accessors
    // ------------------------------------------------------------------

    /// Simple name (identity key) of an object.
    pub fn name<T: DomainObject>(&self, obj: T) -> String {
        self.key_of(obj.id())
    }

    /// Namespace-qualified name, e.g. `Model.Order` or `Model.Order.Id`.
    pub fn full_name<T: DomainObject>(&self, obj: T) -> String {
        self.full_name_of(obj.id())
    }

    /// Alias-qualified name, e.g. `Self.Order`. Falls back to the namespace
    /// when the schema declares no alias.
    pub fn alias_name<T: DomainObject>(&self, obj: T) -> String {
        self.qualified_name_of(obj.id(), true)
    }

    pub fn kind<T: DomainObject>(&self, obj: T) -> ObjectKind {
        self.kind_of(obj.id())
    }

    pub fn layer<T: DomainObject>(&self, obj: T) -> Layer {
        self.layer_of(obj.id())
    }

    pub fn is_removed<T: DomainObject>(&self, obj: T) -> bool {
        self.removed(obj.id())
    }

    /// Owning object, `None` for region roots.
    pub fn parent<T: DomainObject>(&self, obj: T) -> Option<AnyObject> {
        self.parent_of(obj.id()).map(AnyObject)
    }

    /// Value of an un-namespaced attribute on the object's node.
    pub fn attribute<T: DomainObject>(&self, obj: T, name: &str) -> Option<&str> {
        self.attr(obj.id(), name)
    }

    /// Backing node of an object.
    pub fn node<T: DomainObject>(&self, obj: T) -> NodeId {
        self.node_of(obj.id())
    }

    // ------------------------------------------------------------------
    // Internal plumbing
    // ------------------------------------------------------------------

    pub(crate) fn root(&self, layer: Layer) -> ObjectId {
        match layer {
            Layer::Conceptual => self.conceptual_root,
            Layer::Storage => self.storage_root,
            Layer::Mapping => self.mapping_root,
        }
    }

    pub(crate) fn kind_of(&self, id: ObjectId) -> ObjectKind {
        self.graph.borrow().get(id).kind
    }

    pub(crate) fn layer_of(&self, id: ObjectId) -> Layer {
        self.graph.borrow().get(id).layer
    }

    pub(crate) fn node_of(&self, id: ObjectId) -> NodeId {
        self.graph.borrow().get(id).node
    }

    pub(crate) fn parent_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.graph.borrow().get(id).parent
    }

    pub(crate) fn removed(&self, id: ObjectId) -> bool {
        self.graph.borrow().get(id).removed
    }

    pub(crate) fn attr(&self, id: ObjectId, name: &str) -> Option<&str> {
        self.tree.attribute(self.node_of(id), name)
    }

    fn key_of_node(&self, node: NodeId, kind: ObjectKind) -> String {
        let key = self.tree.attribute(node, kind.key_attribute());
        let key = match (key, kind) {
            (None, ObjectKind::Condition) => self.tree.attribute(node, "Name"),
            (key, _) => key,
        };
        key.unwrap_or_default().to_string()
    }

    pub(crate) fn key_of(&self, id: ObjectId) -> String {
        self.key_of_node(self.node_of(id), self.kind_of(id))
    }

    pub(crate) fn full_name_of(&self, id: ObjectId) -> String {
        self.qualified_name_of(id, false)
    }

    fn qualified_name_of(&self, id: ObjectId, use_alias: bool) -> String {
        let kind = self.kind_of(id);
        let key = self.key_of(id);
        if kind.is_region_root() {
            return key;
        }
        match self.parent_of(id) {
            Some(parent) if self.kind_of(parent) == ObjectKind::Schema => {
                let schema = self.node_of(parent);
                let qualifier = if use_alias {
                    self.tree
                        .attribute(schema, "Alias")
                        .or_else(|| self.tree.attribute(schema, "Namespace"))
                } else {
                    self.tree.attribute(schema, "Namespace")
                };
                match qualifier {
                    Some(q) => format!("{}.{}", q, key),
                    None => key,
                }
            }
            Some(parent) => format!("{}.{}", self.qualified_name_of(parent, use_alias), key),
            None => key,
        }
    }

    /// Name to write into a reference attribute that targets a schema member
    /// of `layer`: alias-qualified on the storage side, namespace-qualified
    /// on the conceptual side.
    pub(crate) fn reference_name(&self, id: ObjectId) -> String {
        let use_alias = self.layer_of(id) == Layer::Storage;
        self.qualified_name_of(id, use_alias)
    }

    /// Candidate nodes for `kind` children of `parent_node`, in document
    /// order. Scalar mappings and conditions are collected through the
    /// `ComplexProperty` and `EndProperty` wrappers.
    fn scan_nodes(&self, parent_node: NodeId, kind: ObjectKind) -> Vec<NodeId> {
        match kind {
            ObjectKind::ScalarMapping | ObjectKind::Condition => {
                let mut out = Vec::new();
                self.scan_mapping_members(parent_node, kind.element(), &mut out);
                out
            }
            _ => self
                .tree
                .child_elements(parent_node, kind.element())
                .collect(),
        }
    }

    fn scan_mapping_members(&self, node: NodeId, element: &str, out: &mut Vec<NodeId>) {
        for &child in self.tree.children(node) {
            match self.tree.local_name(child) {
                name if name == element => out.push(child),
                "ComplexProperty" | "EndProperty" => self.scan_mapping_members(child, element, out),
                _ => {}
            }
        }
    }

    /// All children of `kind` under `parent`.
    ///
    /// The first call walks the backing nodes and marks the collection
    /// complete; later calls are served from the cache.
    pub(crate) fn children_of(&self, parent: ObjectId, kind: ObjectKind) -> Vec<ObjectId> {
        let (parent_node, layer) = {
            let graph = self.graph.borrow();
            if let Some(cache) = graph.cache(parent, kind) {
                if cache.is_complete() {
                    return cache.values();
                }
            }
            let data = graph.get(parent);
            (data.node, data.layer)
        };

        let nodes = self.scan_nodes(parent_node, kind);
        let mut graph = self.graph.borrow_mut();
        graph.cache_mut(parent, kind).begin_scan();

        let mut scanned = IndexMap::with_capacity(nodes.len());
        for node in nodes {
            let id = match graph.object_for_node(node) {
                Some(id) => id,
                None => {
                    trace!(%kind, ?node, "materialized");
                    graph.alloc(kind, layer, node, Some(parent))
                }
            };
            scanned.insert(fold_key(&self.key_of_node(node, kind)), id);
        }

        let cache = graph.cache_mut(parent, kind);
        cache.finish_scan(scanned);
        cache.values()
    }

    /// Child of `kind` under `parent` with identity key `key`.
    pub(crate) fn child_by_key(&self, parent: ObjectId, kind: ObjectKind, key: &str) -> Option<ObjectId> {
        let parent_node = {
            let graph = self.graph.borrow();
            if let Some(cache) = graph.cache(parent, kind) {
                if let Some(id) = cache.get(key) {
                    return Some(id);
                }
                if cache.is_complete() {
                    return None;
                }
            }
            graph.get(parent).node
        };

        let node = self
            .scan_nodes(parent_node, kind)
            .into_iter()
            .find(|&n| eq_ci(&self.key_of_node(n, kind), key))?;

        let mut graph = self.graph.borrow_mut();
        let id = match graph.object_for_node(node) {
            Some(id) => id,
            None => {
                let layer = graph.get(parent).layer;
                trace!(%kind, ?node, "materialized");
                graph.alloc(kind, layer, node, Some(parent))
            }
        };
        graph.cache_mut(parent, kind).insert(key, id);
        Some(id)
    }

    pub(crate) fn typed_children<T: DomainObject>(&self, parent: ObjectId, kind: ObjectKind) -> Vec<T> {
        self.children_of(parent, kind)
            .into_iter()
            .map(T::from_id)
            .collect()
    }

    /// The entity container of a schema layer.
    pub(crate) fn container(&self, layer: Layer) -> Option<ObjectId> {
        match layer {
            Layer::Mapping => Some(self.mapping_root),
            _ => self
                .children_of(self.root(layer), ObjectKind::EntityContainer)
                .into_iter()
                .next(),
        }
    }

    /// Look up a schema member by simple or qualified name. A qualifier must
    /// match the schema's namespace or alias.
    pub(crate) fn schema_member(&self, layer: Layer, kind: ObjectKind, name: &str) -> Option<ObjectId> {
        let root = self.root(layer);
        let (qualifier, simple) = split_qualified(name.trim());
        if let Some(qualifier) = qualifier {
            let schema = self.node_of(root);
            let matches = |attr: &str| self.tree.attribute(schema, attr).is_some_and(|v| eq_ci(v, qualifier));
            if !matches("Namespace") && !matches("Alias") {
                return None;
            }
        }
        self.child_by_key(root, kind, simple)
    }

    /// Look up an entity container member by simple name. A container-name
    /// qualifier is accepted and ignored.
    pub(crate) fn container_member(&self, layer: Layer, kind: ObjectKind, name: &str) -> Option<ObjectId> {
        let container = self.container(layer)?;
        let (_, simple) = split_qualified(name.trim());
        self.child_by_key(container, kind, simple)
    }

    /// Kind and full name of an object, for error context.
    pub(crate) fn describe(&self, id: ObjectId) -> (ObjectKind, String) {
        (self.kind_of(id), self.full_name_of(id))
    }
}
