//! Structural mutation: add, rename and remove with propagation
//!
//! Every mutation binds the whole graph first (`resolve_all`), so each object
//! that refers to the changed one is subscribed before the change is
//! published. Effects are applied in subscription order and returned as a
//! log of [`Notification`]s.

use std::collections::VecDeque;

use tracing::debug;

use super::handles::DomainObject;
use super::notify::{Notification, Subscriber};
use super::references::{format_type_names, parse_type_names, requalify, RefSlot, RemovalPolicy};
use super::{EdmxModel, Layer, ObjectId, ObjectKind};
use crate::document::NodeId;
use crate::error::{EdmxError, Result};
use crate::util::eq_ci;

/// Wrapper elements that only group scalar mappings and conditions.
const MAPPING_WRAPPERS: &[&str] = &["ComplexProperty", "EndProperty"];

impl EdmxModel {
    pub(crate) fn ensure_live(&self, id: ObjectId) -> Result<()> {
        if self.removed(id) {
            let (kind, name) = self.describe(id);
            return Err(EdmxError::ObjectRemoved { kind, name });
        }
        Ok(())
    }

    /// Reject an empty required argument before touching the tree.
    pub(crate) fn require(&self, owner: ObjectId, argument: &'static str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            let (owner_kind, owner) = self.describe(owner);
            return Err(EdmxError::MissingArgument {
                owner_kind,
                owner,
                argument,
            });
        }
        Ok(())
    }

    pub(crate) fn invalid_reference(&self, owner: ObjectId, message: impl Into<String>) -> EdmxError {
        let (owner_kind, owner) = self.describe(owner);
        EdmxError::InvalidReference {
            owner_kind,
            owner,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_mutation(&self, owner: ObjectId, message: impl Into<String>) -> EdmxError {
        let (owner_kind, owner) = self.describe(owner);
        EdmxError::InvalidMutation {
            owner_kind,
            owner,
            message: message.into(),
        }
    }

    /// Names of schema and container members are simple identifiers: every
    /// lookup splits qualified names on their last dot.
    pub(crate) fn check_simple_name(&self, owner: ObjectId, kind: ObjectKind, name: &str) -> Result<()> {
        if name.contains('.') {
            return Err(self.invalid_mutation(owner, format!("'{}' is not a valid {} name", name, kind)));
        }
        Ok(())
    }

    /// Fail when `parent` already has a `kind` child keyed `key`.
    pub(crate) fn check_unique(&self, parent: ObjectId, kind: ObjectKind, key: &str) -> Result<()> {
        if self.child_by_key(parent, kind, key).is_some() {
            let (owner_kind, owner) = self.describe(parent);
            return Err(EdmxError::DuplicateMember {
                owner_kind,
                owner,
                member_kind: kind,
                name: key.to_string(),
            });
        }
        Ok(())
    }

    /// Create a child element under the parent's own node and register it.
    pub(crate) fn add_child(
        &mut self,
        parent: ObjectId,
        kind: ObjectKind,
        key: &str,
        attributes: &[(&str, &str)],
    ) -> Result<ObjectId> {
        let host = self.node_of(parent);
        self.add_child_under(parent, host, kind, key, attributes)
    }

    /// Create a child element under `host` (the parent's node or one of its
    /// wrapper elements) and register it in the parent's identity cache.
    ///
    /// Validation happens before any node is created.
    pub(crate) fn add_child_under(
        &mut self,
        parent: ObjectId,
        host: NodeId,
        kind: ObjectKind,
        key: &str,
        attributes: &[(&str, &str)],
    ) -> Result<ObjectId> {
        self.ensure_live(parent)?;
        self.require(parent, kind.key_attribute(), key)?;
        if kind.is_renamable() {
            self.check_simple_name(parent, kind, key)?;
        }
        self.check_unique(parent, kind, key)?;

        let name = self.tree.name_in_scope_of(host, kind.element());
        let node = self.tree.create_element(name);
        self.tree.set_attribute(node, kind.key_attribute(), key);
        for (attr, value) in attributes {
            self.tree.set_attribute(node, attr, value);
        }
        match kind {
            ObjectKind::Property => {
                self.tree
                    .insert_before_first(host, &["NavigationProperty"], node)
            }
            ObjectKind::AssociationEnd => {
                self.tree
                    .insert_before_first(host, &["ReferentialConstraint"], node)
            }
            ObjectKind::ScalarMapping => self.tree.insert_before_first(host, &["Condition"], node),
            _ => self.tree.append_child(host, node),
        }

        let layer = self.layer_of(parent);
        self.bound.set(false);
        let graph = self.graph.get_mut();
        let id = graph.alloc(kind, layer, node, Some(parent));
        graph.cache_mut(parent, kind).insert(key, id);
        debug!(%kind, name = key, parent = %self.full_name_of(parent), "added");
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Rename
    // ------------------------------------------------------------------

    /// Rename an object and propagate the new name to every reference.
    ///
    /// Returns the rename notification for the object followed by one for
    /// each dependent whose own identity key changed.
    pub fn rename<T: DomainObject>(&mut self, obj: T, new_name: &str) -> Result<Vec<Notification>> {
        let id = obj.id();
        self.ensure_live(id)?;
        let kind = self.kind_of(id);
        if !kind.is_renamable() {
            return Err(self.invalid_mutation(id, format!("{} names follow the objects they map", kind)));
        }
        self.require(id, "name", new_name)?;
        self.check_simple_name(id, kind, new_name)?;

        let old_name = self.key_of(id);
        if old_name == new_name {
            return Ok(Vec::new());
        }
        if let Some(parent) = self.parent_of(id) {
            if self
                .child_by_key(parent, kind, new_name)
                .is_some_and(|existing| existing != id)
            {
                let (owner_kind, owner) = self.describe(parent);
                return Err(EdmxError::DuplicateMember {
                    owner_kind,
                    owner,
                    member_kind: kind,
                    name: new_name.to_string(),
                });
            }
        }

        self.resolve_all();
        debug!(%kind, old = %old_name, new = new_name, "renaming");

        let node = self.node_of(id);
        self.tree.set_attribute(node, kind.key_attribute(), new_name);
        if let Some(parent) = self.parent_of(id) {
            self.graph
                .get_mut()
                .cache_mut(parent, kind)
                .rekey(&old_name, new_name, id);
        }

        let mut log = vec![Notification::Renamed {
            object: id,
            kind,
            old_name: old_name.clone(),
            new_name: new_name.to_string(),
        }];

        let subscribers = self.graph.get_mut().bus.subscribers(id);
        for subscriber in subscribers {
            if let Subscriber::Reference { holder, slot } = subscriber {
                self.rewrite_reference(holder, slot, new_name, &mut log);
            }
        }

        match kind {
            ObjectKind::Property => self.rename_property_refs(id, &old_name, new_name),
            ObjectKind::AssociationEnd => self.rename_role(id, &old_name, new_name, &mut log),
            ObjectKind::ComplexType => self.rename_complex_type_uses(id, &old_name, new_name),
            ObjectKind::EntityContainer => self.rename_container(id, new_name),
            _ => {}
        }

        // Holders that were dangling may name the object now.
        self.bound.set(false);
        Ok(log)
    }

    /// Point `holder`'s `slot` attribute at `new_name`, keeping the
    /// qualifier it was written with.
    fn rewrite_reference(&mut self, holder: ObjectId, slot: RefSlot, new_name: &str, log: &mut Vec<Notification>) {
        let Some(raw) = self.attr(holder, slot.attribute()).map(str::to_string) else {
            return;
        };
        let value = match slot {
            RefSlot::MappedType(i) => {
                let mut items = parse_type_names(&raw);
                let Some(item) = items.get_mut(i as usize) else {
                    return;
                };
                item.name = requalify(&item.name, new_name);
                format_type_names(&items)
            }
            _ if slot.is_qualified() => requalify(&raw, new_name),
            _ => new_name.to_string(),
        };
        self.set_key_or_attribute(holder, slot.attribute(), &raw, &value, log);
    }

    /// Write an attribute on `id`; when it is the identity key, re-key the
    /// parent cache and log the rename.
    fn set_key_or_attribute(
        &mut self,
        id: ObjectId,
        attribute: &str,
        old_value: &str,
        new_value: &str,
        log: &mut Vec<Notification>,
    ) {
        let kind = self.kind_of(id);
        let node = self.node_of(id);
        self.tree.set_attribute(node, attribute, new_value);
        if attribute != kind.key_attribute() || old_value == new_value {
            return;
        }
        if let Some(parent) = self.parent_of(id) {
            self.graph
                .get_mut()
                .cache_mut(parent, kind)
                .rekey(old_value, new_value, id);
        }
        debug!(%kind, old = old_value, new = new_value, "re-keyed dependent");
        log.push(Notification::Renamed {
            object: id,
            kind,
            old_name: old_value.to_string(),
            new_name: new_value.to_string(),
        });
    }

    /// `PropertyRef` elements naming a property: the owner's key and the
    /// referential constraint roles played by the owner.
    fn property_refs(&self, property: ObjectId, name: &str) -> Vec<NodeId> {
        let Some(owner) = self.parent_of(property) else {
            return Vec::new();
        };
        let mut hosts: Vec<NodeId> = self
            .tree
            .first_child_element(self.node_of(owner), "Key")
            .into_iter()
            .collect();
        hosts.extend(self.constraint_roles_for(owner));
        hosts
            .into_iter()
            .flat_map(|host| self.tree.child_elements(host, "PropertyRef").collect::<Vec<_>>())
            .filter(|&r| self.tree.attribute(r, "Name").is_some_and(|v| eq_ci(v, name)))
            .collect()
    }

    /// `Principal`/`Dependent` elements of referential constraints whose
    /// role is played by an end typed `entity_type`.
    pub(crate) fn constraint_roles_for(&self, entity_type: ObjectId) -> Vec<NodeId> {
        let mut roles = Vec::new();
        for end in self.holders_of(entity_type, |s| s == RefSlot::EndType) {
            let Some(association) = self.parent_of(end) else {
                continue;
            };
            let role = self.key_of(end);
            let Some(constraint) = self
                .tree
                .first_child_element(self.node_of(association), "ReferentialConstraint")
            else {
                continue;
            };
            for side in ["Principal", "Dependent"] {
                roles.extend(
                    self.tree
                        .child_elements(constraint, side)
                        .filter(|&n| self.tree.attribute(n, "Role").is_some_and(|r| eq_ci(r, &role))),
                );
            }
        }
        roles
    }

    fn rename_property_refs(&mut self, property: ObjectId, old_name: &str, new_name: &str) {
        for node in self.property_refs(property, old_name) {
            self.tree.set_attribute(node, "Name", new_name);
        }
    }

    /// A role rename reaches the constraint, navigation properties, set
    /// ends and association set mapping end properties.
    fn rename_role(&mut self, end: ObjectId, old_role: &str, new_role: &str, log: &mut Vec<Notification>) {
        let Some(association) = self.parent_of(end) else {
            return;
        };
        let assoc_node = self.node_of(association);

        let mut role_nodes = Vec::new();
        if let Some(constraint) = self.tree.first_child_element(assoc_node, "ReferentialConstraint") {
            for side in ["Principal", "Dependent"] {
                role_nodes.extend(self.tree.child_elements(constraint, side));
            }
        }
        for node in role_nodes {
            if self.tree.attribute(node, "Role").is_some_and(|r| eq_ci(r, old_role)) {
                self.tree.set_attribute(node, "Role", new_role);
            }
        }

        for nav in self.holders_of(association, |s| s == RefSlot::Relationship) {
            let nav_node = self.node_of(nav);
            for attr in ["FromRole", "ToRole"] {
                if self.tree.attribute(nav_node, attr).is_some_and(|r| eq_ci(r, old_role)) {
                    self.tree.set_attribute(nav_node, attr, new_role);
                }
            }
        }

        for set in self.holders_of(association, |s| s == RefSlot::SetAssociation) {
            if let Some(set_end) = self.child_by_key(set, ObjectKind::AssociationSetEnd, old_role) {
                self.set_key_or_attribute(set_end, "Role", old_role, new_role, log);
            }
        }

        for mapping in self.holders_of(association, |s| s == RefSlot::MappedAssociation) {
            let wrappers: Vec<NodeId> = self
                .tree
                .child_elements(self.node_of(mapping), "EndProperty")
                .collect();
            for wrapper in wrappers {
                if self.tree.attribute(wrapper, "Name").is_some_and(|r| eq_ci(r, old_role)) {
                    self.tree.set_attribute(wrapper, "Name", new_role);
                }
            }
        }
    }

    /// Property types and `ComplexProperty` wrappers name complex types by
    /// qualified name; they are not cached references.
    fn rename_complex_type_uses(&mut self, complex: ObjectId, old_name: &str, new_name: &str) {
        let Some(schema) = self.parent_of(complex) else {
            return;
        };
        let schema_node = self.node_of(schema);
        let qualifiers: Vec<String> = ["Namespace", "Alias"]
            .iter()
            .filter_map(|a| self.tree.attribute(schema_node, a).map(str::to_string))
            .collect();
        let refers = |value: &str| {
            qualifiers
                .iter()
                .any(|q| eq_ci(value, &format!("{}.{}", q, old_name)))
        };

        let mut edits = Vec::new();
        for root in [self.root(Layer::Conceptual), self.root(Layer::Mapping)] {
            for node in self.tree.descendants(self.node_of(root)) {
                let attr = match self.tree.local_name(node) {
                    "Property" => "Type",
                    "ComplexProperty" => "TypeName",
                    _ => continue,
                };
                if let Some(value) = self.tree.attribute(node, attr) {
                    if refers(value) {
                        edits.push((node, attr, requalify(value, new_name)));
                    }
                }
            }
        }
        for (node, attr, value) in edits {
            self.tree.set_attribute(node, attr, &value);
        }
    }

    fn rename_container(&mut self, container: ObjectId, new_name: &str) {
        let attr = match self.layer_of(container) {
            Layer::Conceptual => "CdmEntityContainer",
            Layer::Storage => "StorageEntityContainer",
            Layer::Mapping => return,
        };
        let mapping = self.node_of(self.mapping_root);
        self.tree.set_attribute(mapping, attr, new_name);
    }

    // ------------------------------------------------------------------
    // Remove
    // ------------------------------------------------------------------

    /// Remove an object, its children and every dependent that cannot exist
    /// without it.
    ///
    /// Dependents with an optional reference (a base type, a function
    /// import's entity set) only lose their cached resolution. The returned
    /// log lists removals in the order they were applied; children precede
    /// their parent.
    pub fn remove<T: DomainObject>(&mut self, obj: T) -> Result<Vec<Notification>> {
        let id = obj.id();
        self.ensure_live(id)?;
        if self.kind_of(id).is_region_root() {
            return Err(self.invalid_mutation(id, "layer roots cannot be removed"));
        }

        self.resolve_all();
        debug!(kind = %self.kind_of(id), name = %self.full_name_of(id), "removing");

        self.bound.set(false);
        let mut pending = VecDeque::from([id]);
        let mut log = Vec::new();
        while let Some(next) = pending.pop_front() {
            self.remove_one(next, &mut pending, &mut log);
        }
        Ok(log)
    }

    fn remove_one(&mut self, id: ObjectId, pending: &mut VecDeque<ObjectId>, log: &mut Vec<Notification>) {
        if self.removed(id) {
            return;
        }
        let kind = self.kind_of(id);
        for &child_kind in kind.child_kinds() {
            for child in self.children_of(id, child_kind) {
                self.remove_one(child, pending, log);
            }
        }

        let name = self.key_of(id);
        if kind == ObjectKind::Property {
            self.drop_property_refs(id, &name);
        }

        let subscribers = self.graph.get_mut().bus.take_subscribers(id);
        for subscriber in subscribers {
            match subscriber {
                Subscriber::Collection { parent } => {
                    self.graph.get_mut().cache_mut(parent, kind).evict(&name, id);
                }
                Subscriber::Reference { holder, slot } => match slot.on_target_removed() {
                    RemovalPolicy::Invalidate => self.graph.get_mut().invalidate(holder, slot),
                    RemovalPolicy::CascadeRemove => {
                        let victim = match slot {
                            RefSlot::EndType | RefSlot::SetEndEntitySet => {
                                self.parent_of(holder).unwrap_or(holder)
                            }
                            _ => holder,
                        };
                        if !self.removed(victim) && !pending.contains(&victim) {
                            debug!(kind = %self.kind_of(victim), name = %self.full_name_of(victim), "cascading removal");
                            pending.push_back(victim);
                        }
                    }
                },
            }
        }

        let graph = self.graph.get_mut();
        graph.bus.unsubscribe_holder(id);
        let data = graph.get_mut(id);
        data.references.clear();
        data.removed = true;

        let node = self.node_of(id);
        let wrapper = self.tree.parent(node);
        self.tree.detach(node);
        if let Some(wrapper) = wrapper {
            self.prune_empty_wrapper(wrapper);
        }

        debug!(%kind, %name, "removed");
        log.push(Notification::Removed {
            object: id,
            kind,
            name,
        });
    }

    /// Detach `ComplexProperty`/`EndProperty` wrappers left without mappings.
    fn prune_empty_wrapper(&mut self, node: NodeId) {
        let mut current = node;
        while MAPPING_WRAPPERS.contains(&self.tree.local_name(current))
            && !self.tree.children(current).iter().any(|&c| self.tree.is_element(c))
        {
            let parent = self.tree.parent(current);
            self.tree.detach(current);
            match parent {
                Some(p) => current = p,
                None => break,
            }
        }
    }

    /// Drop key entries and referential constraints naming a removed
    /// property.
    fn drop_property_refs(&mut self, property: ObjectId, name: &str) {
        for node in self.property_refs(property, name) {
            let Some(host) = self.tree.parent(node) else {
                continue;
            };
            match self.tree.local_name(host) {
                "Key" => {
                    self.tree.detach(node);
                    if !self.tree.children(host).iter().any(|&c| self.tree.is_element(c)) {
                        self.tree.detach(host);
                    }
                }
                _ => {
                    if let Some(constraint) = self.tree.parent(host) {
                        self.tree.detach(constraint);
                    }
                }
            }
        }
    }
}
