//! Entity containers: entity sets, association sets and function imports,
//! plus stored functions and parameters

use std::fmt;

use super::handles::{
    Association, AssociationSet, AssociationSetEnd, EntitySet, EntityType, Function,
    FunctionImport, Parameter, ParameterOwner,
};
use super::references::RefSlot;
use super::{EdmxModel, Layer, ObjectId, ObjectKind};
use crate::error::Result;
use crate::types::ScalarTypeDescriptor;
use crate::util::{eq_ci, parse_bool};

/// Direction of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterMode::In => "In",
            ParameterMode::Out => "Out",
            ParameterMode::InOut => "InOut",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [ParameterMode::In, ParameterMode::Out, ParameterMode::InOut]
            .into_iter()
            .find(|m| eq_ci(m.as_str(), value.trim()))
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a new stored function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: String,
    /// Database schema, e.g. `dbo`
    pub schema: Option<String>,
    pub is_composable: bool,
    pub return_type: Option<String>,
}

impl FunctionSpec {
    /// A non-composable stored procedure in `dbo`.
    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: Some("dbo".to_string()),
            is_composable: false,
            return_type: None,
        }
    }
}

impl EdmxModel {
    /// The entity container of a schema layer, created when missing.
    fn ensure_container(&mut self, layer: Layer) -> Result<ObjectId> {
        if let Some(container) = self.container(layer) {
            return Ok(container);
        }
        let root = self.root(layer);
        let namespace = self.attr(root, "Namespace").unwrap_or_default().to_string();
        let name = match layer {
            Layer::Storage => format!("{}Container", namespace.replace('.', "")),
            _ => format!("{}Entities", namespace.replace('.', "")),
        };
        let id = self.add_child(root, ObjectKind::EntityContainer, &name, &[])?;
        let node = self.node_of(id);
        let schema = self.node_of(root);
        self.tree.insert_child_at(schema, 0, node);

        let mapping_attribute = match layer {
            Layer::Storage => "StorageEntityContainer",
            _ => "CdmEntityContainer",
        };
        let mapping = self.node_of(self.mapping_root);
        self.tree.set_attribute(mapping, mapping_attribute, &name);
        Ok(id)
    }

    /// Name of a schema layer's entity container.
    pub fn container_name(&self, layer: Layer) -> Option<String> {
        self.container(layer).map(|c| self.key_of(c))
    }

    // ------------------------------------------------------------------
    // Entity sets
    // ------------------------------------------------------------------

    pub fn entity_sets(&self, layer: Layer) -> Vec<EntitySet> {
        match self.container(layer) {
            Some(container) if layer != Layer::Mapping => {
                self.typed_children(container, ObjectKind::EntitySet)
            }
            _ => Vec::new(),
        }
    }

    pub fn find_entity_set(&self, layer: Layer, name: &str) -> Option<EntitySet> {
        if layer == Layer::Mapping {
            return None;
        }
        self.container_member(layer, ObjectKind::EntitySet, name)
            .map(EntitySet)
    }

    /// Add an entity set of `entity_type` to the container of its layer.
    pub fn add_entity_set(&mut self, name: &str, entity_type: EntityType) -> Result<EntitySet> {
        self.ensure_live(entity_type.0)?;
        let layer = self.layer_of(entity_type.0);
        let container = self.ensure_container(layer)?;
        let type_name = self.reference_name(entity_type.0);
        let mut attributes = vec![("EntityType", type_name.as_str())];
        if layer == Layer::Storage {
            attributes.push(("Schema", "dbo"));
        }
        let id = self.add_child(container, ObjectKind::EntitySet, name, &attributes)?;
        Ok(EntitySet(id))
    }

    pub fn entity_set_type(&self, set: EntitySet) -> Option<EntityType> {
        self.resolve_as(set.0, RefSlot::SetEntityType)
    }

    /// Entity sets whose element type is `entity_type`.
    pub fn entity_sets_of(&self, entity_type: EntityType) -> Vec<EntitySet> {
        self.ensure_bound();
        self.holders_of(entity_type.0, |s| s == RefSlot::SetEntityType)
            .into_iter()
            .map(EntitySet)
            .collect()
    }

    /// The entity set holding instances of `entity_type`: its own set, or
    /// the set of the nearest base type.
    pub fn entity_set_for_type(&self, entity_type: EntityType) -> Option<EntitySet> {
        self.type_hierarchy(entity_type)
            .into_iter()
            .find_map(|t| self.entity_sets_of(t).into_iter().next())
    }

    // ------------------------------------------------------------------
    // Association sets
    // ------------------------------------------------------------------

    pub fn association_sets(&self, layer: Layer) -> Vec<AssociationSet> {
        match self.container(layer) {
            Some(container) if layer != Layer::Mapping => {
                self.typed_children(container, ObjectKind::AssociationSet)
            }
            _ => Vec::new(),
        }
    }

    pub fn find_association_set(&self, layer: Layer, name: &str) -> Option<AssociationSet> {
        if layer == Layer::Mapping {
            return None;
        }
        self.container_member(layer, ObjectKind::AssociationSet, name)
            .map(AssociationSet)
    }

    /// Add an association set. `ends` pairs each role of the association
    /// with the entity set playing it.
    pub fn add_association_set(
        &mut self,
        name: &str,
        association: Association,
        ends: &[(&str, EntitySet)],
    ) -> Result<AssociationSet> {
        self.ensure_live(association.0)?;
        let layer = self.layer_of(association.0);
        let container = self.ensure_container(layer)?;
        self.require(container, "Name", name)?;
        self.check_unique(container, ObjectKind::AssociationSet, name)?;

        let roles = self.association_ends(association);
        if ends.len() != roles.len() {
            return Err(self.invalid_reference(
                container,
                format!("association set '{}' must bind every end of its association", name),
            ));
        }
        for &(role, set) in ends {
            self.ensure_live(set.0)?;
            if self.find_association_end(association, role).is_none() {
                return Err(self.invalid_reference(
                    container,
                    format!("'{}' is not a role of '{}'", role, self.full_name_of(association.0)),
                ));
            }
            if self.layer_of(set.0) != layer {
                return Err(self.invalid_reference(
                    container,
                    format!("entity set for role '{}' is in another layer", role),
                ));
            }
        }

        let association_name = self.reference_name(association.0);
        let id = self.add_child(
            container,
            ObjectKind::AssociationSet,
            name,
            &[("Association", association_name.as_str())],
        )?;
        for &(role, set) in ends {
            let set_name = self.key_of(set.0);
            self.add_child(
                id,
                ObjectKind::AssociationSetEnd,
                role,
                &[("EntitySet", set_name.as_str())],
            )?;
        }
        Ok(AssociationSet(id))
    }

    pub fn association_set_association(&self, set: AssociationSet) -> Option<Association> {
        self.resolve_as(set.0, RefSlot::SetAssociation)
    }

    pub fn association_set_ends(&self, set: AssociationSet) -> Vec<AssociationSetEnd> {
        self.typed_children(set.0, ObjectKind::AssociationSetEnd)
    }

    pub fn set_end_entity_set(&self, end: AssociationSetEnd) -> Option<EntitySet> {
        self.resolve_as(end.0, RefSlot::SetEndEntitySet)
    }

    // ------------------------------------------------------------------
    // Functions and function imports
    // ------------------------------------------------------------------

    /// Stored functions and procedures of the storage layer.
    pub fn functions(&self) -> Vec<Function> {
        self.typed_children(self.root(Layer::Storage), ObjectKind::Function)
    }

    pub fn find_function(&self, name: &str) -> Option<Function> {
        self.schema_member(Layer::Storage, ObjectKind::Function, name)
            .map(Function)
    }

    pub fn add_function(&mut self, spec: &FunctionSpec) -> Result<Function> {
        let root = self.root(Layer::Storage);
        let composable = if spec.is_composable { "true" } else { "false" };
        let mut attributes = vec![
            ("Aggregate", "false"),
            ("BuiltIn", "false"),
            ("NiladicFunction", "false"),
            ("IsComposable", composable),
            ("ParameterTypeSemantics", "AllowImplicitConversion"),
        ];
        if let Some(schema) = spec.schema.as_deref() {
            attributes.push(("Schema", schema));
        }
        if let Some(return_type) = spec.return_type.as_deref() {
            attributes.push(("ReturnType", return_type));
        }
        self.add_child(root, ObjectKind::Function, &spec.name, &attributes)
            .map(Function)
    }

    pub fn is_composable(&self, function: Function) -> bool {
        self.attr(function.0, "IsComposable")
            .and_then(parse_bool)
            .unwrap_or(true)
    }

    pub fn function_imports(&self) -> Vec<FunctionImport> {
        match self.container(Layer::Conceptual) {
            Some(container) => self.typed_children(container, ObjectKind::FunctionImport),
            None => Vec::new(),
        }
    }

    pub fn find_function_import(&self, name: &str) -> Option<FunctionImport> {
        self.container_member(Layer::Conceptual, ObjectKind::FunctionImport, name)
            .map(FunctionImport)
    }

    /// Add a function import, optionally returning entities of `entity_set`.
    pub fn add_function_import(
        &mut self,
        name: &str,
        return_type: Option<&str>,
        entity_set: Option<EntitySet>,
    ) -> Result<FunctionImport> {
        let container = self.ensure_container(Layer::Conceptual)?;
        let set_name = match entity_set {
            Some(set) => {
                self.ensure_live(set.0)?;
                if self.layer_of(set.0) != Layer::Conceptual {
                    return Err(self.invalid_reference(container, "function imports return conceptual entity sets"));
                }
                Some(self.key_of(set.0))
            }
            None => None,
        };
        let mut attributes = Vec::new();
        if let Some(return_type) = return_type {
            attributes.push(("ReturnType", return_type));
        }
        if let Some(set_name) = set_name.as_deref() {
            attributes.push(("EntitySet", set_name));
        }
        self.add_child(container, ObjectKind::FunctionImport, name, &attributes)
            .map(FunctionImport)
    }

    pub fn function_import_entity_set(&self, import: FunctionImport) -> Option<EntitySet> {
        self.resolve_as(import.0, RefSlot::ImportEntitySet)
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    pub fn parameters(&self, owner: impl Into<ParameterOwner>) -> Vec<Parameter> {
        self.typed_children(owner.into().id(), ObjectKind::Parameter)
    }

    pub fn find_parameter(&self, owner: impl Into<ParameterOwner>, name: &str) -> Option<Parameter> {
        self.child_by_key(owner.into().id(), ObjectKind::Parameter, name)
            .map(Parameter)
    }

    pub fn add_parameter(
        &mut self,
        owner: impl Into<ParameterOwner>,
        name: &str,
        type_name: &str,
        mode: ParameterMode,
    ) -> Result<Parameter> {
        let owner = owner.into().id();
        self.require(owner, "Type", type_name)?;
        self.add_child(
            owner,
            ObjectKind::Parameter,
            name,
            &[("Type", type_name), ("Mode", mode.as_str())],
        )
        .map(Parameter)
    }

    pub fn parameter_mode(&self, parameter: Parameter) -> Option<ParameterMode> {
        self.attr(parameter.0, "Mode").and_then(ParameterMode::parse)
    }

    /// Normalized parameter type. Parameters never compare nullability,
    /// fixed length or unicode.
    pub fn parameter_type_descriptor(&self, parameter: Parameter) -> ScalarTypeDescriptor {
        let type_name = self.attr(parameter.0, "Type").unwrap_or_default();
        let facets = self.facets_of(self.node_of(parameter.0));
        match self.layer_of(parameter.0) {
            Layer::Storage => ScalarTypeDescriptor::for_store_function_parameter(type_name, &facets),
            _ => ScalarTypeDescriptor::for_model_function_parameter(type_name, &facets),
        }
    }
}
