//! Typed, copyable handles over [`ObjectId`]

use super::{ObjectId, ObjectKind};

/// A typed handle to a domain object.
///
/// A handle is an index into the graph of the [`EdmxModel`](super::EdmxModel)
/// that issued it. Passing it to any other model is a logic error: the call
/// panics or reads an unrelated object.
pub trait DomainObject: Copy {
    /// Kinds this handle may denote.
    const KINDS: &'static [ObjectKind];

    fn id(&self) -> ObjectId;

    #[doc(hidden)]
    fn from_id(id: ObjectId) -> Self;
}

macro_rules! domain_handles {
    ($($(#[$meta:meta])* $name:ident => [$($kind:ident),+];)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(pub(crate) ObjectId);

            impl DomainObject for $name {
                const KINDS: &'static [ObjectKind] = &[$(ObjectKind::$kind),+];

                fn id(&self) -> ObjectId {
                    self.0
                }

                fn from_id(id: ObjectId) -> Self {
                    $name(id)
                }
            }

            impl From<$name> for ObjectId {
                fn from(handle: $name) -> ObjectId {
                    handle.0
                }
            }
        )+
    };
}

domain_handles! {
    /// Conceptual entity type or storage table.
    EntityType => [EntityType];
    /// Conceptual complex type.
    ComplexType => [ComplexType];
    /// Scalar property of an entity or complex type; a column on the storage side.
    Property => [Property];
    NavigationProperty => [NavigationProperty];
    /// Conceptual association or storage foreign key.
    Association => [Association];
    AssociationEnd => [AssociationEnd];
    EntitySet => [EntitySet];
    AssociationSet => [AssociationSet];
    AssociationSetEnd => [AssociationSetEnd];
    /// Stored function or procedure.
    Function => [Function];
    FunctionImport => [FunctionImport];
    Parameter => [Parameter];
    EntitySetMapping => [EntitySetMapping];
    EntityTypeMapping => [EntityTypeMapping];
    MappingFragment => [MappingFragment];
    /// `ScalarProperty` mapping of one conceptual property to one column.
    ScalarMapping => [ScalarMapping];
    /// Discriminator condition inside a mapping fragment.
    Condition => [Condition];
    AssociationSetMapping => [AssociationSetMapping];
    FunctionImportMapping => [FunctionImportMapping];
    /// Any domain object.
    AnyObject => [
        Schema, EntityContainer, ContainerMapping, EntityType, ComplexType, Property,
        NavigationProperty, Association, AssociationEnd, EntitySet, AssociationSet,
        AssociationSetEnd, Function, FunctionImport, Parameter, EntitySetMapping,
        EntityTypeMapping, MappingFragment, ScalarMapping, Condition,
        AssociationSetMapping, FunctionImportMapping
    ];
}

/// Owner of scalar properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyOwner {
    Entity(EntityType),
    Complex(ComplexType),
}

impl From<EntityType> for PropertyOwner {
    fn from(t: EntityType) -> Self {
        PropertyOwner::Entity(t)
    }
}

impl From<ComplexType> for PropertyOwner {
    fn from(t: ComplexType) -> Self {
        PropertyOwner::Complex(t)
    }
}

impl PropertyOwner {
    pub fn id(&self) -> ObjectId {
        match self {
            PropertyOwner::Entity(t) => t.0,
            PropertyOwner::Complex(t) => t.0,
        }
    }
}

/// Owner of parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterOwner {
    Function(Function),
    Import(FunctionImport),
}

impl From<Function> for ParameterOwner {
    fn from(f: Function) -> Self {
        ParameterOwner::Function(f)
    }
}

impl From<FunctionImport> for ParameterOwner {
    fn from(f: FunctionImport) -> Self {
        ParameterOwner::Import(f)
    }
}

impl ParameterOwner {
    pub fn id(&self) -> ObjectId {
        match self {
            ParameterOwner::Function(f) => f.0,
            ParameterOwner::Import(f) => f.0,
        }
    }
}

/// Owner of scalar mappings and conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingOwner {
    Fragment(MappingFragment),
    AssociationSet(AssociationSetMapping),
}

impl From<MappingFragment> for MappingOwner {
    fn from(f: MappingFragment) -> Self {
        MappingOwner::Fragment(f)
    }
}

impl From<AssociationSetMapping> for MappingOwner {
    fn from(m: AssociationSetMapping) -> Self {
        MappingOwner::AssociationSet(m)
    }
}

impl MappingOwner {
    pub fn id(&self) -> ObjectId {
        match self {
            MappingOwner::Fragment(f) => f.0,
            MappingOwner::AssociationSet(m) => m.0,
        }
    }
}
