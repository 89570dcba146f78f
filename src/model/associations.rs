//! Associations, their ends and referential constraints

use std::fmt;
use std::str::FromStr;

use super::handles::{Association, AssociationEnd, EntityType};
use super::references::RefSlot;
use super::{EdmxModel, Layer, ObjectId, ObjectKind};
use crate::document::NodeId;
use crate::error::Result;
use crate::util::eq_ci;

/// Cardinality of an association end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// `1`
    One,
    /// `0..1`
    ZeroOrOne,
    /// `*`
    Many,
}

impl Multiplicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::One => "1",
            Multiplicity::ZeroOrOne => "0..1",
            Multiplicity::Many => "*",
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Multiplicity {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Multiplicity::One),
            "0..1" => Ok(Multiplicity::ZeroOrOne),
            "*" => Ok(Multiplicity::Many),
            _ => Err(()),
        }
    }
}

/// One end of a new association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndSpec {
    pub role: String,
    pub entity_type: EntityType,
    pub multiplicity: Multiplicity,
}

impl EndSpec {
    pub fn new(role: impl Into<String>, entity_type: EntityType, multiplicity: Multiplicity) -> Self {
        Self {
            role: role.into(),
            entity_type,
            multiplicity,
        }
    }
}

/// A `ReferentialConstraint`: principal key properties paired in order
/// with dependent foreign key properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferentialConstraint {
    pub principal_role: String,
    pub principal_properties: Vec<String>,
    pub dependent_role: String,
    pub dependent_properties: Vec<String>,
}

/// Declaration of a new association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSpec {
    pub name: String,
    pub ends: [EndSpec; 2],
    pub constraint: Option<ReferentialConstraint>,
}

impl EdmxModel {
    pub fn associations(&self, layer: Layer) -> Vec<Association> {
        if layer == Layer::Mapping {
            return Vec::new();
        }
        self.typed_children(self.root(layer), ObjectKind::Association)
    }

    pub fn find_association(&self, layer: Layer, name: &str) -> Option<Association> {
        if layer == Layer::Mapping {
            return None;
        }
        self.schema_member(layer, ObjectKind::Association, name)
            .map(Association)
    }

    /// Add an association with both ends and an optional referential
    /// constraint. Everything is validated before the first node is created.
    pub fn add_association(&mut self, layer: Layer, spec: &AssociationSpec) -> Result<Association> {
        let root = self.root(layer);
        if layer == Layer::Mapping {
            return Err(self.invalid_mutation(root, "the mapping layer declares no associations"));
        }
        self.require(root, "Name", &spec.name)?;
        self.check_unique(root, ObjectKind::Association, &spec.name)?;

        for end in &spec.ends {
            self.require(root, "Role", &end.role)?;
            self.ensure_live(end.entity_type.0)?;
            if self.layer_of(end.entity_type.0) != layer {
                return Err(self.invalid_reference(
                    root,
                    format!("end '{}' is typed from another layer", end.role),
                ));
            }
        }
        if eq_ci(&spec.ends[0].role, &spec.ends[1].role) {
            return Err(self.invalid_reference(
                root,
                format!("association '{}' repeats role '{}'", spec.name, spec.ends[0].role),
            ));
        }
        if let Some(constraint) = &spec.constraint {
            self.check_constraint(root, spec, constraint)?;
        }

        let id = self.add_child(root, ObjectKind::Association, &spec.name, &[])?;
        for end in &spec.ends {
            let type_name = self.reference_name(end.entity_type.0);
            self.add_child(
                id,
                ObjectKind::AssociationEnd,
                &end.role,
                &[
                    ("Type", type_name.as_str()),
                    ("Multiplicity", end.multiplicity.as_str()),
                ],
            )?;
        }
        if let Some(constraint) = &spec.constraint {
            self.write_constraint(self.node_of(id), constraint);
        }
        Ok(Association(id))
    }

    fn check_constraint(
        &self,
        owner: ObjectId,
        spec: &AssociationSpec,
        constraint: &ReferentialConstraint,
    ) -> Result<()> {
        if constraint.principal_properties.len() != constraint.dependent_properties.len()
            || constraint.principal_properties.is_empty()
        {
            return Err(self.invalid_reference(
                owner,
                "referential constraint needs matching, non-empty property lists",
            ));
        }
        let sides = [
            (&constraint.principal_role, &constraint.principal_properties),
            (&constraint.dependent_role, &constraint.dependent_properties),
        ];
        for (role, properties) in sides {
            let Some(end) = spec.ends.iter().find(|e| eq_ci(&e.role, role)) else {
                return Err(self.invalid_reference(
                    owner,
                    format!("constraint role '{}' is not an end of '{}'", role, spec.name),
                ));
            };
            for property in properties {
                if self
                    .property_in_hierarchy(end.entity_type.0, property)
                    .is_none()
                {
                    return Err(self.invalid_reference(
                        owner,
                        format!(
                            "'{}' has no property '{}'",
                            self.full_name_of(end.entity_type.0),
                            property
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn write_constraint(&mut self, association: NodeId, constraint: &ReferentialConstraint) {
        let name = self.tree.name_in_scope_of(association, "ReferentialConstraint");
        let element = self.tree.create_element(name);
        self.tree.append_child(association, element);
        let sides = [
            ("Principal", &constraint.principal_role, &constraint.principal_properties),
            ("Dependent", &constraint.dependent_role, &constraint.dependent_properties),
        ];
        for (side, role, properties) in sides {
            let side_name = self.tree.name_in_scope_of(element, side);
            let side_node = self
                .tree
                .append_element(element, side_name, &[("Role", role.as_str())]);
            for property in properties {
                let ref_name = self.tree.name_in_scope_of(side_node, "PropertyRef");
                self.tree
                    .append_element(side_node, ref_name, &[("Name", property.as_str())]);
            }
        }
    }

    pub fn association_ends(&self, association: Association) -> Vec<AssociationEnd> {
        self.typed_children(association.0, ObjectKind::AssociationEnd)
    }

    pub fn find_association_end(&self, association: Association, role: &str) -> Option<AssociationEnd> {
        self.child_by_key(association.0, ObjectKind::AssociationEnd, role)
            .map(AssociationEnd)
    }

    pub fn end_type(&self, end: AssociationEnd) -> Option<EntityType> {
        self.resolve_as(end.0, RefSlot::EndType)
    }

    pub fn end_multiplicity(&self, end: AssociationEnd) -> Option<Multiplicity> {
        self.attr(end.0, "Multiplicity")?.parse().ok()
    }

    /// Associations with an end typed `entity_type`.
    pub fn associations_of(&self, entity_type: EntityType) -> Vec<Association> {
        self.ensure_bound();
        let mut out = Vec::new();
        for end in self.holders_of(entity_type.0, |s| s == RefSlot::EndType) {
            if let Some(association) = self.parent_of(end) {
                let association = Association(association);
                if !out.contains(&association) {
                    out.push(association);
                }
            }
        }
        out
    }

    pub fn referential_constraint(&self, association: Association) -> Option<ReferentialConstraint> {
        let constraint = self
            .tree
            .first_child_element(self.node_of(association.0), "ReferentialConstraint")?;
        let side = |name: &str| -> Option<(String, Vec<String>)> {
            let node = self.tree.first_child_element(constraint, name)?;
            let role = self.tree.attribute(node, "Role")?.to_string();
            let properties = self
                .tree
                .child_elements(node, "PropertyRef")
                .filter_map(|r| self.tree.attribute(r, "Name"))
                .map(str::to_string)
                .collect();
            Some((role, properties))
        };
        let (principal_role, principal_properties) = side("Principal")?;
        let (dependent_role, dependent_properties) = side("Dependent")?;
        Some(ReferentialConstraint {
            principal_role,
            principal_properties,
            dependent_role,
            dependent_properties,
        })
    }

    /// Principal and dependent ends as named by the referential constraint.
    pub fn constraint_ends(&self, association: Association) -> Option<(AssociationEnd, AssociationEnd)> {
        let constraint = self.referential_constraint(association)?;
        Some((
            self.find_association_end(association, &constraint.principal_role)?,
            self.find_association_end(association, &constraint.dependent_role)?,
        ))
    }

    /// Both ends are `*`.
    pub fn is_many_to_many(&self, association: Association) -> bool {
        let ends = self.association_ends(association);
        ends.len() == 2
            && ends
                .iter()
                .all(|&e| self.end_multiplicity(e) == Some(Multiplicity::Many))
    }
}
