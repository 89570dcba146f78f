//! Cross-reference slots and their lazy resolution
//!
//! A holder resolves a slot the first time it is asked for the target; the
//! resolution is cached and the holder subscribes to the target, so renames
//! rewrite the holder's attribute and removals either cascade to the holder
//! or drop the cached resolution.

use tracing::{trace, warn};

use super::handles::{AnyObject, DomainObject};
use super::{EdmxModel, Layer, ObjectId, ObjectKind};
use crate::util::{split_qualified, starts_with_ci};

/// One resolvable reference attribute on a holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefSlot {
    /// `EntitySet@EntityType`
    SetEntityType,
    /// `EntityType@BaseType`
    BaseType,
    /// `Association/End@Type`
    EndType,
    /// `AssociationSet@Association`
    SetAssociation,
    /// `AssociationSet/End@EntitySet`
    SetEndEntitySet,
    /// `NavigationProperty@Relationship`
    Relationship,
    /// `FunctionImport@EntitySet`
    ImportEntitySet,
    /// `EntitySetMapping@Name`
    MappedEntitySet,
    /// Item `i` of `EntityTypeMapping@TypeName`
    MappedType(u8),
    /// `MappingFragment@StoreEntitySet`, `AssociationSetMapping@StoreEntitySet`
    StoreEntitySet,
    /// `ScalarProperty@Name`
    MappedProperty,
    /// `ScalarProperty@ColumnName`, `Condition@ColumnName`
    Column,
    /// `AssociationSetMapping@Name`
    MappedAssociationSet,
    /// `AssociationSetMapping@TypeName`
    MappedAssociation,
    /// `FunctionImportMapping@FunctionImportName`
    MappedFunctionImport,
    /// `FunctionImportMapping@FunctionName`
    MappedFunction,
}

/// What happens to a holder when the target of one of its slots is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Forget the resolution; the next access resolves to nothing.
    Invalidate,
    /// Remove the holder (or the object owning it) as well.
    CascadeRemove,
}

impl RefSlot {
    pub fn attribute(&self) -> &'static str {
        match self {
            RefSlot::SetEntityType => "EntityType",
            RefSlot::BaseType => "BaseType",
            RefSlot::EndType => "Type",
            RefSlot::SetAssociation => "Association",
            RefSlot::SetEndEntitySet | RefSlot::ImportEntitySet => "EntitySet",
            RefSlot::Relationship => "Relationship",
            RefSlot::MappedEntitySet | RefSlot::MappedProperty | RefSlot::MappedAssociationSet => {
                "Name"
            }
            RefSlot::MappedType(_) | RefSlot::MappedAssociation => "TypeName",
            RefSlot::StoreEntitySet => "StoreEntitySet",
            RefSlot::Column => "ColumnName",
            RefSlot::MappedFunctionImport => "FunctionImportName",
            RefSlot::MappedFunction => "FunctionName",
        }
    }

    pub fn target_kind(&self) -> ObjectKind {
        match self {
            RefSlot::SetEntityType | RefSlot::BaseType | RefSlot::EndType | RefSlot::MappedType(_) => {
                ObjectKind::EntityType
            }
            RefSlot::SetAssociation | RefSlot::Relationship | RefSlot::MappedAssociation => {
                ObjectKind::Association
            }
            RefSlot::SetEndEntitySet
            | RefSlot::ImportEntitySet
            | RefSlot::MappedEntitySet
            | RefSlot::StoreEntitySet => ObjectKind::EntitySet,
            RefSlot::MappedProperty | RefSlot::Column => ObjectKind::Property,
            RefSlot::MappedAssociationSet => ObjectKind::AssociationSet,
            RefSlot::MappedFunctionImport => ObjectKind::FunctionImport,
            RefSlot::MappedFunction => ObjectKind::Function,
        }
    }

    /// The attribute holds a namespace- or alias-qualified name.
    pub fn is_qualified(&self) -> bool {
        matches!(
            self,
            RefSlot::SetEntityType
                | RefSlot::BaseType
                | RefSlot::EndType
                | RefSlot::SetAssociation
                | RefSlot::Relationship
                | RefSlot::MappedType(_)
                | RefSlot::MappedAssociation
                | RefSlot::MappedFunction
        )
    }

    pub fn on_target_removed(&self) -> RemovalPolicy {
        match self {
            RefSlot::BaseType | RefSlot::ImportEntitySet => RemovalPolicy::Invalidate,
            _ => RemovalPolicy::CascadeRemove,
        }
    }
}

/// One item of an `EntityTypeMapping@TypeName` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypeNameItem {
    pub is_type_of: bool,
    pub name: String,
}

/// Parse `IsTypeOf(Model.A);Model.B` into its items.
pub(crate) fn parse_type_names(value: &str) -> Vec<TypeNameItem> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            if starts_with_ci(item, "IsTypeOf(") && item.ends_with(')') {
                TypeNameItem {
                    is_type_of: true,
                    name: item[9..item.len() - 1].trim().to_string(),
                }
            } else {
                TypeNameItem {
                    is_type_of: false,
                    name: item.to_string(),
                }
            }
        })
        .collect()
}

pub(crate) fn format_type_names(items: &[TypeNameItem]) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_type_of {
                format!("IsTypeOf({})", item.name)
            } else {
                item.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Replace the simple name in a possibly qualified reference, keeping the
/// qualifier the document used.
pub(crate) fn requalify(old_value: &str, new_name: &str) -> String {
    match split_qualified(old_value) {
        (Some(qualifier), _) => format!("{}.{}", qualifier, new_name),
        (None, _) => new_name.to_string(),
    }
}

/// A reference attribute whose target could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub holder: AnyObject,
    pub holder_kind: ObjectKind,
    pub holder_name: String,
    pub attribute: &'static str,
    pub value: String,
}

impl EdmxModel {
    /// Reference slots carried by `holder`.
    pub(crate) fn reference_slots(&self, holder: ObjectId) -> Vec<RefSlot> {
        match self.kind_of(holder) {
            ObjectKind::EntityType => vec![RefSlot::BaseType],
            ObjectKind::EntitySet => vec![RefSlot::SetEntityType],
            ObjectKind::AssociationEnd => vec![RefSlot::EndType],
            ObjectKind::AssociationSet => vec![RefSlot::SetAssociation],
            ObjectKind::AssociationSetEnd => vec![RefSlot::SetEndEntitySet],
            ObjectKind::NavigationProperty => vec![RefSlot::Relationship],
            ObjectKind::FunctionImport => vec![RefSlot::ImportEntitySet],
            ObjectKind::EntitySetMapping => vec![RefSlot::MappedEntitySet],
            ObjectKind::EntityTypeMapping => {
                let count = self
                    .attr(holder, "TypeName")
                    .map_or(0, |v| parse_type_names(v).len());
                (0..count.min(u8::MAX as usize))
                    .map(|i| RefSlot::MappedType(i as u8))
                    .collect()
            }
            ObjectKind::MappingFragment => vec![RefSlot::StoreEntitySet],
            ObjectKind::ScalarMapping => vec![RefSlot::MappedProperty, RefSlot::Column],
            ObjectKind::Condition => vec![RefSlot::Column],
            ObjectKind::AssociationSetMapping => vec![
                RefSlot::MappedAssociationSet,
                RefSlot::MappedAssociation,
                RefSlot::StoreEntitySet,
            ],
            ObjectKind::FunctionImportMapping => {
                vec![RefSlot::MappedFunctionImport, RefSlot::MappedFunction]
            }
            _ => Vec::new(),
        }
    }

    /// Raw name the slot points at; for `MappedType(i)` the i-th type name.
    pub(crate) fn slot_value(&self, holder: ObjectId, slot: RefSlot) -> Option<String> {
        let raw = self.attr(holder, slot.attribute())?;
        match slot {
            RefSlot::MappedType(i) => parse_type_names(raw)
                .into_iter()
                .nth(i as usize)
                .map(|item| item.name),
            _ => Some(raw.to_string()),
        }
    }

    /// Resolve a slot, caching the result and subscribing the holder.
    pub(crate) fn resolve(&self, holder: ObjectId, slot: RefSlot) -> Option<ObjectId> {
        if self.removed(holder) {
            return None;
        }
        if let Some(target) = self.graph.borrow().resolved(holder, slot) {
            return Some(target);
        }
        let target = self.lookup_slot(holder, slot)?;
        trace!(?holder, ?slot, ?target, "resolved reference");
        self.graph.borrow_mut().bind(holder, slot, target);
        Some(target)
    }

    pub(crate) fn resolve_as<T: DomainObject>(&self, holder: ObjectId, slot: RefSlot) -> Option<T> {
        self.resolve(holder, slot).map(T::from_id)
    }

    fn lookup_slot(&self, holder: ObjectId, slot: RefSlot) -> Option<ObjectId> {
        let value = self.slot_value(holder, slot)?;
        let layer = self.layer_of(holder);
        match slot {
            RefSlot::SetEntityType | RefSlot::BaseType | RefSlot::EndType => {
                self.schema_member(layer, ObjectKind::EntityType, &value)
            }
            RefSlot::SetAssociation | RefSlot::Relationship => {
                self.schema_member(layer, ObjectKind::Association, &value)
            }
            RefSlot::SetEndEntitySet => {
                let container = self.parent_of(self.parent_of(holder)?)?;
                self.child_by_key(container, ObjectKind::EntitySet, &value)
            }
            RefSlot::ImportEntitySet | RefSlot::MappedEntitySet => {
                self.container_member(Layer::Conceptual, ObjectKind::EntitySet, &value)
            }
            RefSlot::MappedType(_) => {
                self.schema_member(Layer::Conceptual, ObjectKind::EntityType, &value)
            }
            RefSlot::StoreEntitySet => {
                self.container_member(Layer::Storage, ObjectKind::EntitySet, &value)
            }
            RefSlot::MappedAssociationSet => {
                self.container_member(Layer::Conceptual, ObjectKind::AssociationSet, &value)
            }
            RefSlot::MappedAssociation => {
                self.schema_member(Layer::Conceptual, ObjectKind::Association, &value)
            }
            RefSlot::MappedFunctionImport => {
                self.container_member(Layer::Conceptual, ObjectKind::FunctionImport, &value)
            }
            RefSlot::MappedFunction => {
                self.schema_member(Layer::Storage, ObjectKind::Function, &value)
            }
            RefSlot::MappedProperty => self.lookup_mapped_property(holder, &value),
            RefSlot::Column => self.lookup_column(holder, &value),
        }
    }

    /// The conceptual property a `ScalarProperty@Name` denotes. The owning
    /// type depends on where the mapping sits: a `ComplexProperty` wrapper
    /// names a complex type, an `EndProperty` wrapper names an association
    /// end, and a bare fragment maps the entity type mapping's types.
    fn lookup_mapped_property(&self, holder: ObjectId, name: &str) -> Option<ObjectId> {
        let wrapper = self.tree.parent(self.node_of(holder))?;
        match self.tree.local_name(wrapper) {
            "ComplexProperty" => {
                let type_name = self.tree.attribute(wrapper, "TypeName")?;
                let complex = self.schema_member(Layer::Conceptual, ObjectKind::ComplexType, type_name)?;
                self.child_by_key(complex, ObjectKind::Property, name)
            }
            "EndProperty" => {
                let mapping = self.parent_of(holder)?;
                let association = self.resolve(mapping, RefSlot::MappedAssociation)?;
                let role = self.tree.attribute(wrapper, "Name")?;
                let end = self.child_by_key(association, ObjectKind::AssociationEnd, role)?;
                let entity_type = self.resolve(end, RefSlot::EndType)?;
                self.property_in_hierarchy(entity_type, name)
            }
            _ => {
                let fragment = self.parent_of(holder)?;
                if self.kind_of(fragment) != ObjectKind::MappingFragment {
                    return None;
                }
                let type_mapping = self.parent_of(fragment)?;
                self.reference_slots(type_mapping)
                    .into_iter()
                    .filter_map(|slot| self.resolve(type_mapping, slot))
                    .find_map(|entity_type| self.property_in_hierarchy(entity_type, name))
            }
        }
    }

    /// The storage column a `ColumnName` denotes: a property of the table
    /// behind the owner's store entity set.
    fn lookup_column(&self, holder: ObjectId, name: &str) -> Option<ObjectId> {
        let owner = self.parent_of(holder)?;
        let store_set = self.resolve(owner, RefSlot::StoreEntitySet)?;
        let table = self.resolve(store_set, RefSlot::SetEntityType)?;
        self.child_by_key(table, ObjectKind::Property, name)
    }

    /// Materialize every collection, then resolve every reference slot.
    ///
    /// Returns the references that could not be resolved. Structural
    /// mutations run this first so that every dependent of a renamed or
    /// removed object is subscribed before the change is published.
    pub fn resolve_all(&self) -> Vec<DanglingReference> {
        let mut objects = Vec::new();
        for layer in [Layer::Storage, Layer::Conceptual, Layer::Mapping] {
            self.collect_subtree(self.root(layer), &mut objects);
        }

        let mut dangling = Vec::new();
        for holder in objects {
            for slot in self.reference_slots(holder) {
                let Some(value) = self.slot_value(holder, slot) else {
                    continue;
                };
                if self.resolve(holder, slot).is_none() {
                    let kind = self.kind_of(holder);
                    let holder_name = self.full_name_of(holder);
                    warn!(%kind, holder = %holder_name, attribute = slot.attribute(), %value, "dangling reference");
                    dangling.push(DanglingReference {
                        holder: AnyObject(holder),
                        holder_kind: kind,
                        holder_name,
                        attribute: slot.attribute(),
                        value,
                    });
                }
            }
        }
        self.bound.set(true);
        dangling
    }

    /// Resolve everything once; later calls are free until the next
    /// mutation. Reverse lookups (holders of a target) depend on it.
    pub(crate) fn ensure_bound(&self) {
        if !self.bound.get() {
            self.resolve_all();
        }
    }

    fn collect_subtree(&self, id: ObjectId, out: &mut Vec<ObjectId>) {
        out.push(id);
        for &kind in self.kind_of(id).child_kinds() {
            for child in self.children_of(id, kind) {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Objects whose `slot` currently resolves to `target`.
    pub(crate) fn holders_of(&self, target: ObjectId, filter: impl Fn(RefSlot) -> bool) -> Vec<ObjectId> {
        use super::notify::Subscriber;

        self.graph
            .borrow()
            .bus
            .subscribers(target)
            .into_iter()
            .filter_map(|sub| match sub {
                Subscriber::Reference { holder, slot } if filter(slot) => Some(holder),
                _ => None,
            })
            .collect()
    }
}
