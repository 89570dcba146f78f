//! Rename/removal notifications and the observer registry
//!
//! Subscribers are plain records keyed by the identity of the object they
//! watch. The model applies the effect of each record when it publishes a
//! notification, so cascade order follows subscription order.

use std::collections::HashMap;

use super::references::RefSlot;
use super::{ObjectId, ObjectKind};

/// A change applied to the object graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Renamed {
        object: ObjectId,
        kind: ObjectKind,
        old_name: String,
        new_name: String,
    },
    Removed {
        object: ObjectId,
        kind: ObjectKind,
        name: String,
    },
}

impl Notification {
    pub fn object(&self) -> ObjectId {
        match self {
            Notification::Renamed { object, .. } | Notification::Removed { object, .. } => *object,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, Notification::Removed { .. })
    }
}

/// Who is listening to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Subscriber {
    /// The parent's identity cache for the object's collection
    Collection { parent: ObjectId },
    /// A cross-reference slot on another object resolved to this one
    Reference { holder: ObjectId, slot: RefSlot },
}

/// Observer registry keyed by watched object.
#[derive(Debug, Default)]
pub(crate) struct NotificationBus {
    subscribers: HashMap<ObjectId, Vec<Subscriber>>,
    /// Reverse index: holder -> targets it subscribed to
    held: HashMap<ObjectId, Vec<(ObjectId, RefSlot)>>,
}

impl NotificationBus {
    pub fn subscribe(&mut self, target: ObjectId, subscriber: Subscriber) {
        let list = self.subscribers.entry(target).or_default();
        if list.contains(&subscriber) {
            return;
        }
        list.push(subscriber);
        if let Subscriber::Reference { holder, slot } = subscriber {
            self.held.entry(holder).or_default().push((target, slot));
        }
    }

    pub fn unsubscribe(&mut self, target: ObjectId, subscriber: Subscriber) {
        if let Some(list) = self.subscribers.get_mut(&target) {
            list.retain(|s| *s != subscriber);
        }
        if let Subscriber::Reference { holder, slot } = subscriber {
            if let Some(list) = self.held.get_mut(&holder) {
                list.retain(|&(t, s)| !(t == target && s == slot));
            }
        }
    }

    /// Drop every reference subscription `holder` made.
    pub fn unsubscribe_holder(&mut self, holder: ObjectId) {
        for (target, slot) in self.held.remove(&holder).unwrap_or_default() {
            if let Some(list) = self.subscribers.get_mut(&target) {
                list.retain(|s| *s != Subscriber::Reference { holder, slot });
            }
        }
    }

    /// Current subscribers of `target`, in subscription order.
    pub fn subscribers(&self, target: ObjectId) -> Vec<Subscriber> {
        self.subscribers.get(&target).cloned().unwrap_or_default()
    }

    /// Remove and return the subscribers of a target that is going away.
    /// Reference subscribers are also dropped from their holders' reverse
    /// index so they are never delivered again.
    pub fn take_subscribers(&mut self, target: ObjectId) -> Vec<Subscriber> {
        let subs = self.subscribers.remove(&target).unwrap_or_default();
        for sub in &subs {
            if let Subscriber::Reference { holder, slot } = *sub {
                if let Some(list) = self.held.get_mut(&holder) {
                    list.retain(|&(t, s)| !(t == target && s == slot));
                }
            }
        }
        subs
    }

    /// Number of reference subscriptions made by `holder`.
    #[cfg(test)]
    pub fn held_count(&self, holder: ObjectId) -> usize {
        self.held.get(&holder).map_or(0, Vec::len)
    }
}
