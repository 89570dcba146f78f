//! Object identity, layers and object kinds

use std::fmt;

/// Identity of a materialized domain object. Two handles denote the same
/// object exactly when their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The three layers of an EDMX document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Conceptual,
    Storage,
    Mapping,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Layer::Conceptual => "conceptual",
            Layer::Storage => "storage",
            Layer::Mapping => "mapping",
        })
    }
}

/// Kind of a domain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Schema,
    EntityContainer,
    ContainerMapping,
    EntityType,
    ComplexType,
    Property,
    NavigationProperty,
    Association,
    AssociationEnd,
    EntitySet,
    AssociationSet,
    AssociationSetEnd,
    Function,
    FunctionImport,
    Parameter,
    EntitySetMapping,
    EntityTypeMapping,
    MappingFragment,
    ScalarMapping,
    Condition,
    AssociationSetMapping,
    FunctionImportMapping,
}

impl ObjectKind {
    /// Local name of the backing element.
    pub fn element(&self) -> &'static str {
        match self {
            ObjectKind::Schema => "Schema",
            ObjectKind::EntityContainer => "EntityContainer",
            ObjectKind::ContainerMapping => "EntityContainerMapping",
            ObjectKind::EntityType => "EntityType",
            ObjectKind::ComplexType => "ComplexType",
            ObjectKind::Property => "Property",
            ObjectKind::NavigationProperty => "NavigationProperty",
            ObjectKind::Association => "Association",
            ObjectKind::AssociationEnd | ObjectKind::AssociationSetEnd => "End",
            ObjectKind::EntitySet => "EntitySet",
            ObjectKind::AssociationSet => "AssociationSet",
            ObjectKind::Function => "Function",
            ObjectKind::FunctionImport => "FunctionImport",
            ObjectKind::Parameter => "Parameter",
            ObjectKind::EntitySetMapping => "EntitySetMapping",
            ObjectKind::EntityTypeMapping => "EntityTypeMapping",
            ObjectKind::MappingFragment => "MappingFragment",
            ObjectKind::ScalarMapping => "ScalarProperty",
            ObjectKind::Condition => "Condition",
            ObjectKind::AssociationSetMapping => "AssociationSetMapping",
            ObjectKind::FunctionImportMapping => "FunctionImportMapping",
        }
    }

    /// Attribute holding the object's identity key within its parent.
    pub fn key_attribute(&self) -> &'static str {
        match self {
            ObjectKind::Schema => "Namespace",
            ObjectKind::ContainerMapping => "CdmEntityContainer",
            ObjectKind::AssociationEnd | ObjectKind::AssociationSetEnd => "Role",
            ObjectKind::EntityTypeMapping => "TypeName",
            ObjectKind::MappingFragment => "StoreEntitySet",
            ObjectKind::ScalarMapping | ObjectKind::Condition => "ColumnName",
            ObjectKind::FunctionImportMapping => "FunctionImportName",
            _ => "Name",
        }
    }

    /// Child collections owned by objects of this kind.
    pub fn child_kinds(&self) -> &'static [ObjectKind] {
        match self {
            ObjectKind::Schema => &[
                ObjectKind::EntityContainer,
                ObjectKind::EntityType,
                ObjectKind::ComplexType,
                ObjectKind::Association,
                ObjectKind::Function,
            ],
            ObjectKind::EntityContainer => &[
                ObjectKind::EntitySet,
                ObjectKind::AssociationSet,
                ObjectKind::FunctionImport,
            ],
            ObjectKind::ContainerMapping => &[
                ObjectKind::EntitySetMapping,
                ObjectKind::AssociationSetMapping,
                ObjectKind::FunctionImportMapping,
            ],
            ObjectKind::EntityType => &[ObjectKind::Property, ObjectKind::NavigationProperty],
            ObjectKind::ComplexType => &[ObjectKind::Property],
            ObjectKind::Association => &[ObjectKind::AssociationEnd],
            ObjectKind::AssociationSet => &[ObjectKind::AssociationSetEnd],
            ObjectKind::Function | ObjectKind::FunctionImport => &[ObjectKind::Parameter],
            ObjectKind::EntitySetMapping => &[ObjectKind::EntityTypeMapping],
            ObjectKind::EntityTypeMapping => &[ObjectKind::MappingFragment],
            ObjectKind::MappingFragment | ObjectKind::AssociationSetMapping => {
                &[ObjectKind::ScalarMapping, ObjectKind::Condition]
            }
            _ => &[],
        }
    }

    /// Kinds declared directly in a schema and qualified by its namespace.
    pub fn is_schema_member(&self) -> bool {
        matches!(
            self,
            ObjectKind::EntityType
                | ObjectKind::ComplexType
                | ObjectKind::Association
                | ObjectKind::Function
        )
    }

    /// Region roots, which can be neither renamed nor removed.
    pub fn is_region_root(&self) -> bool {
        matches!(self, ObjectKind::Schema | ObjectKind::ContainerMapping)
    }

    /// Kinds a caller may rename directly. Mapping objects take their names
    /// from the objects they map and follow those renames instead.
    pub fn is_renamable(&self) -> bool {
        !self.is_region_root()
            && !matches!(
                self,
                ObjectKind::EntitySetMapping
                    | ObjectKind::EntityTypeMapping
                    | ObjectKind::MappingFragment
                    | ObjectKind::ScalarMapping
                    | ObjectKind::Condition
                    | ObjectKind::AssociationSetMapping
                    | ObjectKind::FunctionImportMapping
                    | ObjectKind::AssociationSetEnd
            )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Schema => "schema",
            ObjectKind::EntityContainer => "entity container",
            ObjectKind::ContainerMapping => "entity container mapping",
            ObjectKind::EntityType => "entity type",
            ObjectKind::ComplexType => "complex type",
            ObjectKind::Property => "property",
            ObjectKind::NavigationProperty => "navigation property",
            ObjectKind::Association => "association",
            ObjectKind::AssociationEnd => "association end",
            ObjectKind::EntitySet => "entity set",
            ObjectKind::AssociationSet => "association set",
            ObjectKind::AssociationSetEnd => "association set end",
            ObjectKind::Function => "function",
            ObjectKind::FunctionImport => "function import",
            ObjectKind::Parameter => "parameter",
            ObjectKind::EntitySetMapping => "entity set mapping",
            ObjectKind::EntityTypeMapping => "entity type mapping",
            ObjectKind::MappingFragment => "mapping fragment",
            ObjectKind::ScalarMapping => "scalar property mapping",
            ObjectKind::Condition => "mapping condition",
            ObjectKind::AssociationSetMapping => "association set mapping",
            ObjectKind::FunctionImportMapping => "function import mapping",
        })
    }
}
