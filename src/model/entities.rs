//! Entity types, complex types, properties and keys

use std::collections::HashSet;

use tracing::debug;

use super::handles::{ComplexType, EntityType, NavigationProperty, Property, PropertyOwner};
use super::references::RefSlot;
use super::{Association, EdmxModel, Layer, ObjectId, ObjectKind};
use crate::document::{NodeId, ANNOTATION_NS};
use crate::error::Result;
use crate::types::{DeclaredFacets, ScalarTypeDescriptor};
use crate::util::{eq_ci, parse_bool};

/// Declaration of a new scalar property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: String,
    /// Model type name (`Int32`, `Edm.String`, `Model.Address`) on the
    /// conceptual side, native type name (`nvarchar`) on the storage side
    pub type_name: String,
    pub nullable: Option<bool>,
    pub max_length: Option<String>,
    pub fixed_length: Option<bool>,
    pub unicode: Option<bool>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub store_generated_pattern: Option<String>,
    pub default_value: Option<String>,
    pub collation: Option<String>,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn max_length(mut self, max_length: impl Into<String>) -> Self {
        self.max_length = Some(max_length.into());
        self
    }

    pub fn fixed_length(mut self, fixed_length: bool) -> Self {
        self.fixed_length = Some(fixed_length);
        self
    }

    pub fn unicode(mut self, unicode: bool) -> Self {
        self.unicode = Some(unicode);
        self
    }

    pub fn precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn store_generated(mut self, pattern: impl Into<String>) -> Self {
        self.store_generated_pattern = Some(pattern.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }
}

fn schema_layer(layer: Layer) -> bool {
    matches!(layer, Layer::Conceptual | Layer::Storage)
}

impl EdmxModel {
    // ------------------------------------------------------------------
    // Entity and complex types
    // ------------------------------------------------------------------

    /// Entity types of a schema layer in document order. Empty for the
    /// mapping layer.
    pub fn entity_types(&self, layer: Layer) -> Vec<EntityType> {
        if !schema_layer(layer) {
            return Vec::new();
        }
        self.typed_children(self.root(layer), ObjectKind::EntityType)
    }

    /// Look up an entity type by simple, namespace- or alias-qualified name.
    pub fn find_entity_type(&self, layer: Layer, name: &str) -> Option<EntityType> {
        if !schema_layer(layer) {
            return None;
        }
        self.schema_member(layer, ObjectKind::EntityType, name)
            .map(EntityType)
    }

    pub fn add_entity_type(&mut self, layer: Layer, name: &str) -> Result<EntityType> {
        let root = self.root(layer);
        if !schema_layer(layer) {
            return Err(self.invalid_mutation(root, "the mapping layer declares no entity types"));
        }
        self.add_child(root, ObjectKind::EntityType, name, &[])
            .map(EntityType)
    }

    pub fn complex_types(&self) -> Vec<ComplexType> {
        self.typed_children(self.root(Layer::Conceptual), ObjectKind::ComplexType)
    }

    pub fn find_complex_type(&self, name: &str) -> Option<ComplexType> {
        self.schema_member(Layer::Conceptual, ObjectKind::ComplexType, name)
            .map(ComplexType)
    }

    pub fn add_complex_type(&mut self, name: &str) -> Result<ComplexType> {
        let root = self.root(Layer::Conceptual);
        self.add_child(root, ObjectKind::ComplexType, name, &[])
            .map(ComplexType)
    }

    // ------------------------------------------------------------------
    // Inheritance
    // ------------------------------------------------------------------

    pub fn base_type(&self, entity_type: EntityType) -> Option<EntityType> {
        self.resolve_as(entity_type.0, RefSlot::BaseType)
    }

    /// Entity types whose base type is `entity_type`.
    pub fn subtypes(&self, entity_type: EntityType) -> Vec<EntityType> {
        self.entity_types(self.layer_of(entity_type.0))
            .into_iter()
            .filter(|&t| self.base_type(t) == Some(entity_type))
            .collect()
    }

    /// The type has a base type or at least one subtype.
    pub fn has_inheritance(&self, entity_type: EntityType) -> bool {
        self.base_type(entity_type).is_some() || !self.subtypes(entity_type).is_empty()
    }

    /// `entity_type` followed by its base types up to the hierarchy root.
    pub fn type_hierarchy(&self, entity_type: EntityType) -> Vec<EntityType> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = Some(entity_type);
        while let Some(t) = current {
            if !seen.insert(t) {
                break;
            }
            chain.push(t);
            current = self.base_type(t);
        }
        chain
    }

    /// Whether `entity_type` is `ancestor` or derives from it.
    pub fn derives_from(&self, entity_type: EntityType, ancestor: EntityType) -> bool {
        self.type_hierarchy(entity_type).contains(&ancestor)
    }

    /// Set or clear the base type of a conceptual entity type.
    pub fn set_base_type(&mut self, entity_type: EntityType, base: Option<EntityType>) -> Result<()> {
        let id = entity_type.0;
        self.ensure_live(id)?;
        let node = self.node_of(id);
        match base {
            Some(base) => {
                self.ensure_live(base.0)?;
                if self.layer_of(base.0) != self.layer_of(id) {
                    return Err(self.invalid_reference(id, "base type must be declared in the same layer"));
                }
                if self.derives_from(base, entity_type) {
                    return Err(self.invalid_mutation(
                        id,
                        format!("'{}' already derives from it", self.full_name_of(base.0)),
                    ));
                }
                let value = self.reference_name(base.0);
                self.tree.set_attribute(node, "BaseType", &value);
                let graph = self.graph.get_mut();
                graph.unbind(id, RefSlot::BaseType);
                graph.bind(id, RefSlot::BaseType, base.0);
            }
            None => {
                self.tree.remove_attribute(node, "BaseType");
                self.graph.get_mut().unbind(id, RefSlot::BaseType);
            }
        }
        self.bound.set(false);
        debug!(entity_type = %self.full_name_of(id), base = ?base.map(|b| self.full_name_of(b.0)), "set base type");
        Ok(())
    }

    /// Property named `name` declared on `entity_type` or one of its base
    /// types.
    pub(crate) fn property_in_hierarchy(&self, entity_type: ObjectId, name: &str) -> Option<ObjectId> {
        self.type_hierarchy(EntityType(entity_type))
            .into_iter()
            .find_map(|t| self.child_by_key(t.0, ObjectKind::Property, name))
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn properties(&self, owner: impl Into<PropertyOwner>) -> Vec<Property> {
        self.typed_children(owner.into().id(), ObjectKind::Property)
    }

    pub fn find_property(&self, owner: impl Into<PropertyOwner>, name: &str) -> Option<Property> {
        self.child_by_key(owner.into().id(), ObjectKind::Property, name)
            .map(Property)
    }

    /// Add a scalar property. Fails before creating anything when the owner
    /// already has a property of that name.
    pub fn add_property(&mut self, owner: impl Into<PropertyOwner>, spec: &PropertySpec) -> Result<Property> {
        let owner = owner.into().id();
        self.require(owner, "Type", &spec.type_name)?;
        let layer = self.layer_of(owner);

        let precision = spec.precision.map(|p| p.to_string());
        let scale = spec.scale.map(|s| s.to_string());
        let mut attributes: Vec<(&str, &str)> = vec![("Type", spec.type_name.as_str())];
        let flags = [
            ("Nullable", spec.nullable),
            ("FixedLength", spec.fixed_length),
            ("Unicode", spec.unicode),
        ];
        for (name, value) in flags {
            if let Some(value) = value {
                attributes.push((name, if value { "true" } else { "false" }));
            }
        }
        let optional = [
            ("MaxLength", spec.max_length.as_deref()),
            ("Precision", precision.as_deref()),
            ("Scale", scale.as_deref()),
            ("DefaultValue", spec.default_value.as_deref()),
            ("Collation", spec.collation.as_deref()),
        ];
        attributes.extend(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
        if layer == Layer::Storage {
            if let Some(pattern) = spec.store_generated_pattern.as_deref() {
                attributes.push(("StoreGeneratedPattern", pattern));
            }
        }

        let id = self.add_child(owner, ObjectKind::Property, &spec.name, &attributes)?;
        if layer == Layer::Conceptual {
            if let Some(pattern) = spec.store_generated_pattern.as_deref() {
                let node = self.node_of(id);
                self.tree
                    .set_attribute_ns(node, ANNOTATION_NS, "annotation", "StoreGeneratedPattern", pattern);
            }
        }
        Ok(Property(id))
    }

    pub fn property_owner(&self, property: Property) -> Option<PropertyOwner> {
        let parent = self.parent_of(property.0)?;
        match self.kind_of(parent) {
            ObjectKind::EntityType => Some(PropertyOwner::Entity(EntityType(parent))),
            ObjectKind::ComplexType => Some(PropertyOwner::Complex(ComplexType(parent))),
            _ => None,
        }
    }

    /// Declared type name, as written.
    pub fn property_type(&self, property: Property) -> Option<&str> {
        self.attr(property.0, "Type")
    }

    /// Conceptual property typed by a complex type.
    pub fn is_complex_property(&self, property: Property) -> bool {
        self.layer_of(property.0) == Layer::Conceptual
            && self
                .property_type(property)
                .is_some_and(|t| self.find_complex_type(t).is_some())
    }

    pub fn declared_facets(&self, property: Property) -> DeclaredFacets {
        self.facets_of(self.node_of(property.0))
    }

    pub(crate) fn facets_of(&self, node: NodeId) -> DeclaredFacets {
        let attr = |name: &str| self.tree.attribute(node, name);
        DeclaredFacets {
            nullable: attr("Nullable").and_then(parse_bool),
            max_length: attr("MaxLength").map(str::to_string),
            fixed_length: attr("FixedLength").and_then(parse_bool),
            unicode: attr("Unicode").and_then(parse_bool),
            precision: attr("Precision").and_then(|v| v.trim().parse().ok()),
            scale: attr("Scale").and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Normalized type of a property: storage columns go through the native
    /// type table, conceptual properties through the model type names.
    pub fn type_descriptor(&self, property: Property) -> ScalarTypeDescriptor {
        let type_name = self.property_type(property).unwrap_or_default();
        let facets = self.declared_facets(property);
        match self.layer_of(property.0) {
            Layer::Storage => ScalarTypeDescriptor::for_store_column(type_name, &facets),
            _ => ScalarTypeDescriptor::for_model_property(type_name, &facets),
        }
    }

    /// `StoreGeneratedPattern`, plain on columns and an annotation on
    /// conceptual properties.
    pub fn store_generated_pattern(&self, property: Property) -> Option<&str> {
        let node = self.node_of(property.0);
        match self.layer_of(property.0) {
            Layer::Storage => self.tree.attribute(node, "StoreGeneratedPattern"),
            _ => self
                .tree
                .attribute_ns(node, ANNOTATION_NS, "StoreGeneratedPattern"),
        }
    }

    pub fn default_value(&self, property: Property) -> Option<&str> {
        self.attr(property.0, "DefaultValue")
    }

    pub fn collation(&self, property: Property) -> Option<&str> {
        self.attr(property.0, "Collation")
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Key properties. Conceptual subtypes inherit the key of their
    /// hierarchy root.
    pub fn key_properties(&self, entity_type: EntityType) -> Vec<Property> {
        let declaring = match self.layer_of(entity_type.0) {
            Layer::Conceptual => self
                .type_hierarchy(entity_type)
                .last()
                .copied()
                .unwrap_or(entity_type),
            _ => entity_type,
        };
        let node = self.node_of(declaring.0);
        let Some(key) = self.tree.first_child_element(node, "Key") else {
            return Vec::new();
        };
        self.tree
            .child_elements(key, "PropertyRef")
            .filter_map(|r| self.tree.attribute(r, "Name"))
            .filter_map(|name| self.child_by_key(declaring.0, ObjectKind::Property, name))
            .map(Property)
            .collect()
    }

    pub fn is_key_member(&self, property: Property) -> bool {
        match self.property_owner(property) {
            Some(PropertyOwner::Entity(owner)) => self.key_properties(owner).contains(&property),
            _ => false,
        }
    }

    /// Add a property to its owner's key or take it out.
    pub fn set_key_member(&mut self, property: Property, is_key: bool) -> Result<()> {
        let id = property.0;
        self.ensure_live(id)?;
        let Some(PropertyOwner::Entity(owner)) = self.property_owner(property) else {
            return Err(self.invalid_mutation(id, "only entity type properties can be key members"));
        };
        let name = self.key_of(id);
        let owner_node = self.node_of(owner.0);
        let existing_key = self.tree.first_child_element(owner_node, "Key");
        let existing_ref = existing_key.and_then(|key| {
            self.tree
                .child_elements(key, "PropertyRef")
                .find(|&r| self.tree.attribute(r, "Name").is_some_and(|v| eq_ci(v, &name)))
        });

        match (is_key, existing_key, existing_ref) {
            (true, _, Some(_)) | (false, _, None) => return Ok(()),
            (true, key, None) => {
                let key = match key {
                    Some(key) => key,
                    None => {
                        let key_name = self.tree.name_in_scope_of(owner_node, "Key");
                        let key = self.tree.create_element(key_name);
                        self.tree.insert_child_at(owner_node, 0, key);
                        key
                    }
                };
                let ref_name = self.tree.name_in_scope_of(key, "PropertyRef");
                self.tree
                    .append_element(key, ref_name, &[("Name", name.as_str())]);
            }
            (false, key, Some(property_ref)) => {
                self.tree.detach(property_ref);
                if let Some(key) = key {
                    if !self.tree.children(key).iter().any(|&c| self.tree.is_element(c)) {
                        self.tree.detach(key);
                    }
                }
            }
        }
        debug!(property = %self.full_name_of(id), is_key, "set key membership");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Navigation properties
    // ------------------------------------------------------------------

    pub fn navigation_properties(&self, entity_type: EntityType) -> Vec<NavigationProperty> {
        self.typed_children(entity_type.0, ObjectKind::NavigationProperty)
    }

    pub fn find_navigation_property(&self, entity_type: EntityType, name: &str) -> Option<NavigationProperty> {
        self.child_by_key(entity_type.0, ObjectKind::NavigationProperty, name)
            .map(NavigationProperty)
    }

    /// Add a navigation property traversing `association` from `from_role`
    /// to `to_role`. Both roles must be ends of the association.
    pub fn add_navigation_property(
        &mut self,
        entity_type: EntityType,
        name: &str,
        association: Association,
        from_role: &str,
        to_role: &str,
    ) -> Result<NavigationProperty> {
        let owner = entity_type.0;
        self.ensure_live(association.0)?;
        if self.layer_of(owner) != Layer::Conceptual {
            return Err(self.invalid_mutation(owner, "navigation properties are conceptual only"));
        }
        for role in [from_role, to_role] {
            self.require(owner, "Role", role)?;
            if self.find_association_end(association, role).is_none() {
                return Err(self.invalid_reference(
                    owner,
                    format!("'{}' is not a role of association '{}'", role, self.full_name_of(association.0)),
                ));
            }
        }
        let relationship = self.reference_name(association.0);
        let id = self.add_child(
            owner,
            ObjectKind::NavigationProperty,
            name,
            &[
                ("Relationship", relationship.as_str()),
                ("FromRole", from_role),
                ("ToRole", to_role),
            ],
        )?;
        Ok(NavigationProperty(id))
    }

    pub fn navigation_association(&self, navigation: NavigationProperty) -> Option<Association> {
        self.resolve_as(navigation.0, RefSlot::Relationship)
    }
}
