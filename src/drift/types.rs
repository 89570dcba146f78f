//! Result types for drift queries

use std::fmt;

use crate::model::{Association, EntitySet, Property};

/// A column attribute that differs from a linked conceptual property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberDifference {
    KeyMembership,
    Type,
    StoreGeneratedPattern,
    DefaultValue,
    Collation,
}

impl fmt::Display for MemberDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemberDifference::KeyMembership => "key membership",
            MemberDifference::Type => "type",
            MemberDifference::StoreGeneratedPattern => "store generated pattern",
            MemberDifference::DefaultValue => "default value",
            MemberDifference::Collation => "collation",
        })
    }
}

/// A storage column unmapped in an otherwise mapped entity set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmappedMember {
    pub store_set: EntitySet,
    pub column: Property,
}

/// A mapped column whose attributes disagree with some of its conceptual
/// properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedMember {
    pub store_set: EntitySet,
    pub column: Property,
    /// Linked conceptual properties that differ, in mapping order
    pub properties: Vec<Property>,
    /// Every attribute that differed for at least one of them
    pub differences: Vec<MemberDifference>,
}

/// Why a storage association no longer matches its conceptual counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationChange {
    /// The two constraints pair a different number of key properties
    KeyCountDiffers { storage: usize, conceptual: usize },
    /// Storage principal key columns are not among the conceptual principal
    /// properties
    PrincipalKeysDiffer,
    /// Storage foreign key columns are not among the conceptual dependent
    /// properties
    DependentKeysDiffer,
}

impl fmt::Display for AssociationChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssociationChange::KeyCountDiffers {
                storage,
                conceptual,
            } => write!(f, "{} storage key pairs vs {} conceptual", storage, conceptual),
            AssociationChange::PrincipalKeysDiffer => write!(f, "principal keys differ"),
            AssociationChange::DependentKeysDiffer => write!(f, "dependent keys differ"),
        }
    }
}

/// A storage association whose conceptual counterpart declares different
/// keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedAssociation {
    pub storage: Association,
    pub conceptual: Association,
    pub reason: AssociationChange,
}

/// Results of every drift query over one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    pub unmapped_entity_sets: Vec<EntitySet>,
    pub unmapped_members: Vec<UnmappedMember>,
    pub changed_members: Vec<ChangedMember>,
    pub missing_associations: Vec<Association>,
    pub changed_associations: Vec<ChangedAssociation>,
}

impl DriftReport {
    /// Returns true if any query found drift.
    pub fn has_drift(&self) -> bool {
        !self.unmapped_entity_sets.is_empty()
            || !self.unmapped_members.is_empty()
            || !self.changed_members.is_empty()
            || !self.missing_associations.is_empty()
            || !self.changed_associations.is_empty()
    }
}
