//! Arena of materialized domain objects

use std::collections::HashMap;

use super::cache::IdentityCache;
use super::notify::{NotificationBus, Subscriber};
use super::references::RefSlot;
use super::{Layer, ObjectId, ObjectKind};
use crate::document::NodeId;

#[derive(Debug)]
pub(crate) struct ObjectData {
    pub kind: ObjectKind,
    pub layer: Layer,
    pub node: NodeId,
    pub parent: Option<ObjectId>,
    pub removed: bool,
    pub children: HashMap<ObjectKind, IdentityCache>,
    /// Resolved cross-references. Absent slots are pending: never resolved,
    /// or invalidated since.
    pub references: HashMap<RefSlot, ObjectId>,
}

/// Every object materialized so far, plus the observer registry.
#[derive(Debug, Default)]
pub(crate) struct ObjectGraph {
    objects: Vec<ObjectData>,
    node_index: HashMap<NodeId, ObjectId>,
    pub bus: NotificationBus,
}

impl ObjectGraph {
    /// Allocate a wrapper for `node`. Callers must check
    /// [`ObjectGraph::object_for_node`] first.
    pub fn alloc(
        &mut self,
        kind: ObjectKind,
        layer: Layer,
        node: NodeId,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        debug_assert!(!self.node_index.contains_key(&node));
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(ObjectData {
            kind,
            layer,
            node,
            parent,
            removed: false,
            children: HashMap::new(),
            references: HashMap::new(),
        });
        self.node_index.insert(node, id);
        if let Some(parent) = parent {
            self.bus.subscribe(id, Subscriber::Collection { parent });
        }
        id
    }

    pub fn object_for_node(&self, node: NodeId) -> Option<ObjectId> {
        self.node_index.get(&node).copied()
    }

    /// Panics when `id` was allocated by another graph past this one's end.
    pub fn get(&self, id: ObjectId) -> &ObjectData {
        &self.objects[id.index()]
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut ObjectData {
        &mut self.objects[id.index()]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn cache(&self, parent: ObjectId, kind: ObjectKind) -> Option<&IdentityCache> {
        self.get(parent).children.get(&kind)
    }

    pub fn cache_mut(&mut self, parent: ObjectId, kind: ObjectKind) -> &mut IdentityCache {
        self.get_mut(parent).children.entry(kind).or_default()
    }

    pub fn resolved(&self, holder: ObjectId, slot: RefSlot) -> Option<ObjectId> {
        match self.get(holder).references.get(&slot) {
            Some(&target) if !self.get(target).removed => Some(target),
            _ => None,
        }
    }

    /// Record a resolution and subscribe the holder to the target.
    pub fn bind(&mut self, holder: ObjectId, slot: RefSlot, target: ObjectId) {
        let previous = self.get_mut(holder).references.insert(slot, target);
        if let Some(old) = previous {
            if old != target {
                self.bus
                    .unsubscribe(old, Subscriber::Reference { holder, slot });
            }
        }
        self.bus
            .subscribe(target, Subscriber::Reference { holder, slot });
    }

    /// Forget a resolution so the next access re-resolves lazily.
    pub fn invalidate(&mut self, holder: ObjectId, slot: RefSlot) {
        self.get_mut(holder).references.remove(&slot);
    }

    /// Forget a resolution and stop listening to its target. Used when the
    /// holder's attribute is rewritten to point elsewhere.
    pub fn unbind(&mut self, holder: ObjectId, slot: RefSlot) {
        if let Some(old) = self.get_mut(holder).references.remove(&slot) {
            self.bus
                .unsubscribe(old, Subscriber::Reference { holder, slot });
        }
    }
}
