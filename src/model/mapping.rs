//! The mapping layer: set, type and fragment mappings, scalar property
//! mappings and discriminator conditions

use super::handles::{
    Association, AssociationSet, AssociationSetMapping, Condition, EntitySet, EntitySetMapping,
    EntityType, EntityTypeMapping, Function, FunctionImport, FunctionImportMapping,
    MappingFragment, MappingOwner, Property, ScalarMapping,
};
use super::references::{parse_type_names, RefSlot};
use super::{EdmxModel, Layer, ObjectId, ObjectKind};
use crate::document::NodeId;
use crate::error::Result;
use crate::util::{eq_ci, parse_bool};

/// The conceptual member a storage column is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnMember {
    /// Scalar property mapped in an entity set mapping fragment
    Property(Property),
    /// Association whose set mapping maps the column as an end key
    Association(Association),
}

/// Required value of a discriminator column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    /// `Value="..."`
    Equals(String),
    /// `IsNull="true"` or `IsNull="false"`
    IsNull(bool),
}

/// Mappings that read from one storage entity set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSetMappings {
    pub fragments: Vec<MappingFragment>,
    pub association_set_mappings: Vec<AssociationSetMapping>,
}

impl StoreSetMappings {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.association_set_mappings.is_empty()
    }
}

impl EdmxModel {
    fn mapping_root_id(&self) -> ObjectId {
        self.root(Layer::Mapping)
    }

    fn expect_layer(&self, owner: ObjectId, object: ObjectId, layer: Layer) -> Result<()> {
        self.ensure_live(object)?;
        if self.layer_of(object) != layer {
            return Err(self.invalid_reference(
                owner,
                format!(
                    "{} '{}' is not in the {} layer",
                    self.kind_of(object),
                    self.full_name_of(object),
                    layer
                ),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entity set mappings
    // ------------------------------------------------------------------

    pub fn entity_set_mappings(&self) -> Vec<EntitySetMapping> {
        self.typed_children(self.mapping_root_id(), ObjectKind::EntitySetMapping)
    }

    pub fn find_entity_set_mapping(&self, name: &str) -> Option<EntitySetMapping> {
        self.child_by_key(self.mapping_root_id(), ObjectKind::EntitySetMapping, name)
            .map(EntitySetMapping)
    }

    /// Map a conceptual entity set. Type mappings and fragments are added
    /// separately.
    pub fn add_entity_set_mapping(&mut self, set: EntitySet) -> Result<EntitySetMapping> {
        let root = self.mapping_root_id();
        self.expect_layer(root, set.0, Layer::Conceptual)?;
        let name = self.key_of(set.0);
        self.add_child(root, ObjectKind::EntitySetMapping, &name, &[])
            .map(EntitySetMapping)
    }

    pub fn mapped_entity_set(&self, mapping: EntitySetMapping) -> Option<EntitySet> {
        self.resolve_as(mapping.0, RefSlot::MappedEntitySet)
    }

    // ------------------------------------------------------------------
    // Entity type mappings
    // ------------------------------------------------------------------

    pub fn entity_type_mappings(&self, mapping: EntitySetMapping) -> Vec<EntityTypeMapping> {
        self.typed_children(mapping.0, ObjectKind::EntityTypeMapping)
    }

    /// Look up a type mapping by its full `TypeName` value.
    pub fn find_entity_type_mapping(&self, mapping: EntitySetMapping, type_name: &str) -> Option<EntityTypeMapping> {
        self.child_by_key(mapping.0, ObjectKind::EntityTypeMapping, type_name)
            .map(EntityTypeMapping)
    }

    /// Map `entity_type` inside an entity set mapping. With `is_type_of`
    /// the mapping also covers derived types.
    pub fn add_entity_type_mapping(
        &mut self,
        mapping: EntitySetMapping,
        entity_type: EntityType,
        is_type_of: bool,
    ) -> Result<EntityTypeMapping> {
        self.ensure_live(mapping.0)?;
        self.expect_layer(mapping.0, entity_type.0, Layer::Conceptual)?;
        if let Some(set_type) = self
            .mapped_entity_set(mapping)
            .and_then(|set| self.entity_set_type(set))
        {
            if !self.derives_from(entity_type, set_type) {
                return Err(self.invalid_reference(
                    mapping.0,
                    format!(
                        "'{}' is not stored in entity set '{}'",
                        self.full_name_of(entity_type.0),
                        self.key_of(mapping.0)
                    ),
                ));
            }
        }
        let name = self.full_name_of(entity_type.0);
        let type_name = if is_type_of {
            format!("IsTypeOf({})", name)
        } else {
            name
        };
        self.add_child(mapping.0, ObjectKind::EntityTypeMapping, &type_name, &[])
            .map(EntityTypeMapping)
    }

    /// Entity types named by a type mapping, in `TypeName` order.
    pub fn mapped_types(&self, mapping: EntityTypeMapping) -> Vec<EntityType> {
        self.reference_slots(mapping.0)
            .into_iter()
            .filter_map(|slot| self.resolve_as(mapping.0, slot))
            .collect()
    }

    /// Whether the type mapping names `entity_type` through `IsTypeOf(..)`.
    pub fn maps_type_of(&self, mapping: EntityTypeMapping, entity_type: EntityType) -> bool {
        let items = self
            .attr(mapping.0, "TypeName")
            .map(parse_type_names)
            .unwrap_or_default();
        self.reference_slots(mapping.0)
            .into_iter()
            .zip(items)
            .any(|(slot, item)| {
                item.is_type_of && self.resolve(mapping.0, slot) == Some(entity_type.0)
            })
    }

    /// Type mappings naming `entity_type`.
    pub fn type_mappings_of(&self, entity_type: EntityType) -> Vec<EntityTypeMapping> {
        self.ensure_bound();
        let mut out = Vec::new();
        for holder in self.holders_of(entity_type.0, |s| matches!(s, RefSlot::MappedType(_))) {
            if !out.contains(&EntityTypeMapping(holder)) {
                out.push(EntityTypeMapping(holder));
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Fragments
    // ------------------------------------------------------------------

    pub fn mapping_fragments(&self, mapping: EntityTypeMapping) -> Vec<MappingFragment> {
        self.typed_children(mapping.0, ObjectKind::MappingFragment)
    }

    pub fn find_mapping_fragment(&self, mapping: EntityTypeMapping, store_set: &str) -> Option<MappingFragment> {
        self.child_by_key(mapping.0, ObjectKind::MappingFragment, store_set)
            .map(MappingFragment)
    }

    pub fn add_mapping_fragment(&mut self, mapping: EntityTypeMapping, store_set: EntitySet) -> Result<MappingFragment> {
        self.ensure_live(mapping.0)?;
        self.expect_layer(mapping.0, store_set.0, Layer::Storage)?;
        let name = self.key_of(store_set.0);
        self.add_child(mapping.0, ObjectKind::MappingFragment, &name, &[])
            .map(MappingFragment)
    }

    /// Storage entity set a fragment or association set mapping reads from.
    pub fn mapping_store_set(&self, owner: impl Into<MappingOwner>) -> Option<EntitySet> {
        self.resolve_as(owner.into().id(), RefSlot::StoreEntitySet)
    }

    /// Entity set mapping owning a fragment.
    pub fn fragment_set_mapping(&self, fragment: MappingFragment) -> Option<EntitySetMapping> {
        let type_mapping = self.parent_of(fragment.0)?;
        self.parent_of(type_mapping).map(EntitySetMapping)
    }

    pub fn fragment_type_mapping(&self, fragment: MappingFragment) -> Option<EntityTypeMapping> {
        self.parent_of(fragment.0).map(EntityTypeMapping)
    }

    // ------------------------------------------------------------------
    // Scalar mappings
    // ------------------------------------------------------------------

    /// Scalar property mappings of a fragment or association set mapping,
    /// including those nested in `ComplexProperty`/`EndProperty` wrappers.
    pub fn scalar_mappings(&self, owner: impl Into<MappingOwner>) -> Vec<ScalarMapping> {
        self.typed_children(owner.into().id(), ObjectKind::ScalarMapping)
    }

    pub fn find_scalar_mapping(&self, owner: impl Into<MappingOwner>, column: &str) -> Option<ScalarMapping> {
        self.child_by_key(owner.into().id(), ObjectKind::ScalarMapping, column)
            .map(ScalarMapping)
    }

    /// Map a conceptual property to a column of the fragment's table.
    ///
    /// The property must belong to a type the fragment maps (or one of its
    /// base types) and the column to the fragment's store entity set.
    pub fn add_scalar_mapping(
        &mut self,
        fragment: MappingFragment,
        property: Property,
        column: Property,
    ) -> Result<ScalarMapping> {
        let owner = fragment.0;
        self.ensure_live(owner)?;
        self.expect_layer(owner, property.0, Layer::Conceptual)?;
        let name = self.key_of(property.0);

        let type_mapping = self.fragment_type_mapping(fragment);
        let in_mapped_type = type_mapping.is_some_and(|tm| {
            self.mapped_types(tm)
                .into_iter()
                .any(|t| self.property_in_hierarchy(t.0, &name) == Some(property.0))
        });
        if !in_mapped_type {
            return Err(self.invalid_reference(
                owner,
                format!("'{}' is not a property of a mapped type", self.full_name_of(property.0)),
            ));
        }
        self.check_column(owner, column)?;

        let column_name = self.key_of(column.0);
        self.add_child(
            owner,
            ObjectKind::ScalarMapping,
            &column_name,
            &[("Name", name.as_str())],
        )
        .map(ScalarMapping)
    }

    /// Map an association end key property to a column of the association
    /// set mapping's table, inside the `EndProperty` wrapper for `role`.
    pub fn add_end_scalar_mapping(
        &mut self,
        mapping: AssociationSetMapping,
        role: &str,
        property: Property,
        column: Property,
    ) -> Result<ScalarMapping> {
        let owner = mapping.0;
        self.ensure_live(owner)?;
        self.require(owner, "Role", role)?;
        self.expect_layer(owner, property.0, Layer::Conceptual)?;
        let end_type = self
            .mapped_association(mapping)
            .and_then(|a| self.find_association_end(a, role))
            .and_then(|end| self.end_type(end));
        let Some(end_type) = end_type else {
            return Err(self.invalid_reference(owner, format!("'{}' is not a role of the mapped association", role)));
        };
        let name = self.key_of(property.0);
        if self.property_in_hierarchy(end_type.0, &name) != Some(property.0) {
            return Err(self.invalid_reference(
                owner,
                format!("'{}' is not a property of end '{}'", self.full_name_of(property.0), role),
            ));
        }
        self.check_column(owner, column)?;
        let column_name = self.key_of(column.0);
        self.check_unique(owner, ObjectKind::ScalarMapping, &column_name)?;

        let mapping_node = self.node_of(owner);
        let wrapper = self.end_property_wrapper(mapping_node, role);
        self.add_child_under(
            owner,
            wrapper,
            ObjectKind::ScalarMapping,
            &column_name,
            &[("Name", name.as_str())],
        )
        .map(ScalarMapping)
    }

    fn end_property_wrapper(&mut self, mapping: NodeId, role: &str) -> NodeId {
        let existing = self
            .tree
            .child_elements(mapping, "EndProperty")
            .find(|&n| self.tree.attribute(n, "Name").is_some_and(|r| eq_ci(r, role)));
        if let Some(wrapper) = existing {
            return wrapper;
        }
        let name = self.tree.name_in_scope_of(mapping, "EndProperty");
        let wrapper = self.tree.create_element(name);
        self.tree.set_attribute(wrapper, "Name", role);
        self.tree.insert_before_first(mapping, &["Condition"], wrapper);
        wrapper
    }

    /// `column` must be a column of the table behind `owner`'s store set.
    fn check_column(&self, owner: ObjectId, column: Property) -> Result<()> {
        self.expect_layer(owner, column.0, Layer::Storage)?;
        let table = self
            .resolve(owner, RefSlot::StoreEntitySet)
            .and_then(|set| self.resolve(set, RefSlot::SetEntityType));
        if table.is_none() || self.parent_of(column.0) != table {
            return Err(self.invalid_reference(
                owner,
                format!("column '{}' is not in the mapped store entity set", self.full_name_of(column.0)),
            ));
        }
        Ok(())
    }

    /// Conceptual property a scalar mapping maps.
    pub fn scalar_mapping_property(&self, mapping: ScalarMapping) -> Option<Property> {
        self.resolve_as(mapping.0, RefSlot::MappedProperty)
    }

    /// Storage column a scalar mapping or condition reads.
    pub fn mapped_column(&self, mapping: impl Into<MappedColumnHolder>) -> Option<Property> {
        self.resolve_as(mapping.into().0, RefSlot::Column)
    }

    /// Association end role of a scalar mapping nested in `EndProperty`.
    pub fn scalar_mapping_end_role(&self, mapping: ScalarMapping) -> Option<&str> {
        let wrapper = self.tree.parent(self.node_of(mapping.0))?;
        if self.tree.local_name(wrapper) != "EndProperty" {
            return None;
        }
        self.tree.attribute(wrapper, "Name")
    }

    // ------------------------------------------------------------------
    // Conditions
    // ------------------------------------------------------------------

    pub fn conditions(&self, owner: impl Into<MappingOwner>) -> Vec<Condition> {
        self.typed_children(owner.into().id(), ObjectKind::Condition)
    }

    /// Add a discriminator condition on `column` of `store_set` to the
    /// fragment of `mapping` that reads that set.
    ///
    /// Fails with an invalid reference, creating nothing, when the type
    /// mapping has no fragment for the store set or the set's table has no
    /// such column.
    pub fn add_condition(
        &mut self,
        mapping: EntityTypeMapping,
        store_set: EntitySet,
        column: &str,
        value: ConditionValue,
    ) -> Result<Condition> {
        let owner = mapping.0;
        self.ensure_live(owner)?;
        self.require(owner, "ColumnName", column)?;
        self.expect_layer(owner, store_set.0, Layer::Storage)?;

        let fragment = self
            .mapping_fragments(mapping)
            .into_iter()
            .find(|&f| self.mapping_store_set(f) == Some(store_set));
        let Some(fragment) = fragment else {
            return Err(self.invalid_reference(
                owner,
                format!("no mapping fragment for store entity set '{}'", self.key_of(store_set.0)),
            ));
        };
        let has_column = self
            .entity_set_type(store_set)
            .and_then(|table| self.find_property(table, column))
            .is_some();
        if !has_column {
            return Err(self.invalid_reference(
                owner,
                format!("store entity set '{}' has no column '{}'", self.key_of(store_set.0), column),
            ));
        }

        let (attribute, text) = match &value {
            ConditionValue::Equals(v) => ("Value", v.clone()),
            ConditionValue::IsNull(b) => ("IsNull", b.to_string()),
        };
        self.add_child(
            fragment.0,
            ObjectKind::Condition,
            column,
            &[(attribute, text.as_str())],
        )
        .map(Condition)
    }

    pub fn condition_value(&self, condition: Condition) -> Option<ConditionValue> {
        if let Some(value) = self.attr(condition.0, "Value") {
            return Some(ConditionValue::Equals(value.to_string()));
        }
        self.attr(condition.0, "IsNull")
            .and_then(parse_bool)
            .map(ConditionValue::IsNull)
    }

    // ------------------------------------------------------------------
    // Association set mappings
    // ------------------------------------------------------------------

    pub fn association_set_mappings(&self) -> Vec<AssociationSetMapping> {
        self.typed_children(self.mapping_root_id(), ObjectKind::AssociationSetMapping)
    }

    pub fn find_association_set_mapping(&self, name: &str) -> Option<AssociationSetMapping> {
        self.child_by_key(self.mapping_root_id(), ObjectKind::AssociationSetMapping, name)
            .map(AssociationSetMapping)
    }

    /// Map a conceptual association set onto a storage entity set (the
    /// foreign key table or a join table).
    pub fn add_association_set_mapping(
        &mut self,
        set: AssociationSet,
        store_set: EntitySet,
    ) -> Result<AssociationSetMapping> {
        let root = self.mapping_root_id();
        self.expect_layer(root, set.0, Layer::Conceptual)?;
        self.expect_layer(root, store_set.0, Layer::Storage)?;
        let Some(association) = self.association_set_association(set) else {
            return Err(self.invalid_reference(
                root,
                format!("association set '{}' has no association", self.key_of(set.0)),
            ));
        };
        let name = self.key_of(set.0);
        let type_name = self.full_name_of(association.0);
        let store_name = self.key_of(store_set.0);
        self.add_child(
            root,
            ObjectKind::AssociationSetMapping,
            &name,
            &[
                ("TypeName", type_name.as_str()),
                ("StoreEntitySet", store_name.as_str()),
            ],
        )
        .map(AssociationSetMapping)
    }

    pub fn mapped_association_set(&self, mapping: AssociationSetMapping) -> Option<AssociationSet> {
        self.resolve_as(mapping.0, RefSlot::MappedAssociationSet)
    }

    pub fn mapped_association(&self, mapping: AssociationSetMapping) -> Option<Association> {
        self.resolve_as(mapping.0, RefSlot::MappedAssociation)
    }

    // ------------------------------------------------------------------
    // Function import mappings
    // ------------------------------------------------------------------

    pub fn function_import_mappings(&self) -> Vec<FunctionImportMapping> {
        self.typed_children(self.mapping_root_id(), ObjectKind::FunctionImportMapping)
    }

    pub fn find_function_import_mapping(&self, import_name: &str) -> Option<FunctionImportMapping> {
        self.child_by_key(self.mapping_root_id(), ObjectKind::FunctionImportMapping, import_name)
            .map(FunctionImportMapping)
    }

    pub fn add_function_import_mapping(
        &mut self,
        import: FunctionImport,
        function: Function,
    ) -> Result<FunctionImportMapping> {
        let root = self.mapping_root_id();
        self.expect_layer(root, import.0, Layer::Conceptual)?;
        self.expect_layer(root, function.0, Layer::Storage)?;
        let import_name = self.key_of(import.0);
        let function_name = self.full_name_of(function.0);
        self.add_child(
            root,
            ObjectKind::FunctionImportMapping,
            &import_name,
            &[("FunctionName", function_name.as_str())],
        )
        .map(FunctionImportMapping)
    }

    pub fn mapped_function_import(&self, mapping: FunctionImportMapping) -> Option<FunctionImport> {
        self.resolve_as(mapping.0, RefSlot::MappedFunctionImport)
    }

    pub fn mapped_function(&self, mapping: FunctionImportMapping) -> Option<Function> {
        self.resolve_as(mapping.0, RefSlot::MappedFunction)
    }

    // ------------------------------------------------------------------
    // Column and store set resolution
    // ------------------------------------------------------------------

    /// Conceptual members a storage column is mapped to: properties through
    /// entity set mapping fragments, associations through association set
    /// mappings.
    pub fn members_for_column(&self, column: Property) -> Vec<ColumnMember> {
        self.ensure_bound();
        let mut members = Vec::new();
        for holder in self.holders_of(column.0, |s| s == RefSlot::Column) {
            if self.kind_of(holder) != ObjectKind::ScalarMapping {
                continue;
            }
            let Some(owner) = self.parent_of(holder) else {
                continue;
            };
            let member = match self.kind_of(owner) {
                ObjectKind::AssociationSetMapping => self
                    .mapped_association(AssociationSetMapping(owner))
                    .map(ColumnMember::Association),
                _ => self
                    .scalar_mapping_property(ScalarMapping(holder))
                    .map(ColumnMember::Property),
            };
            if let Some(member) = member {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
        }
        members
    }

    /// Storage columns a conceptual property is mapped to.
    pub fn columns_for_property(&self, property: Property) -> Vec<Property> {
        self.ensure_bound();
        let mut columns = Vec::new();
        for holder in self.holders_of(property.0, |s| s == RefSlot::MappedProperty) {
            if let Some(column) = self.resolve_as::<Property>(holder, RefSlot::Column) {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        columns
    }

    /// Conditions that test `column`.
    pub fn conditions_for_column(&self, column: Property) -> Vec<Condition> {
        self.ensure_bound();
        self.holders_of(column.0, |s| s == RefSlot::Column)
            .into_iter()
            .filter(|&h| self.kind_of(h) == ObjectKind::Condition)
            .map(Condition)
            .collect()
    }

    /// Fragments and association set mappings reading `store_set`.
    pub fn mappings_for_store_set(&self, store_set: EntitySet) -> StoreSetMappings {
        self.ensure_bound();
        let mut mappings = StoreSetMappings::default();
        for holder in self.holders_of(store_set.0, |s| s == RefSlot::StoreEntitySet) {
            match self.kind_of(holder) {
                ObjectKind::MappingFragment => mappings.fragments.push(MappingFragment(holder)),
                ObjectKind::AssociationSetMapping => mappings
                    .association_set_mappings
                    .push(AssociationSetMapping(holder)),
                _ => {}
            }
        }
        mappings
    }

    /// Conceptual entity types whose fragments read `store_set`.
    pub fn types_mapped_to(&self, store_set: EntitySet) -> Vec<EntityType> {
        let mut types = Vec::new();
        for fragment in self.mappings_for_store_set(store_set).fragments {
            let Some(type_mapping) = self.fragment_type_mapping(fragment) else {
                continue;
            };
            for t in self.mapped_types(type_mapping) {
                if !types.contains(&t) {
                    types.push(t);
                }
            }
        }
        types
    }
}

/// Mapping objects that read a storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedColumnHolder(ObjectId);

impl From<ScalarMapping> for MappedColumnHolder {
    fn from(m: ScalarMapping) -> Self {
        MappedColumnHolder(m.0)
    }
}

impl From<Condition> for MappedColumnHolder {
    fn from(c: Condition) -> Self {
        MappedColumnHolder(c.0)
    }
}
