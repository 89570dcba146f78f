//! Detect drift between the storage and conceptual layers
//!
//! Every query is a read-only pass over a loaded [`EdmxModel`]. Names in
//! exclusion lists are compared case-insensitively.

mod associations;
mod members;
mod options;
mod types;

pub use associations::{changed_associations, missing_associations};
pub use members::{changed_scalar_members, unmapped_entity_sets, unmapped_scalar_members};
pub use options::{DriftOptions, ExclusionSet, Exclusions, StoreGeneratedPolicy};
pub use types::{
    AssociationChange, ChangedAssociation, ChangedMember, DriftReport, MemberDifference,
    UnmappedMember,
};

use tracing::debug;

use crate::model::EdmxModel;

/// Run all five drift queries.
pub fn detect_drift(model: &EdmxModel, options: &DriftOptions, exclusions: &Exclusions) -> DriftReport {
    let report = DriftReport {
        unmapped_entity_sets: unmapped_entity_sets(model, &exclusions.sets),
        unmapped_members: unmapped_scalar_members(
            model,
            &exclusions.sets,
            &exclusions.types,
            &exclusions.members,
        ),
        changed_members: changed_scalar_members(
            model,
            options,
            &exclusions.sets,
            &exclusions.types,
            &exclusions.members,
        ),
        missing_associations: missing_associations(model, &exclusions.sets, &exclusions.associations),
        changed_associations: changed_associations(model, &exclusions.sets, &exclusions.associations),
    };
    debug!(
        unmapped_sets = report.unmapped_entity_sets.len(),
        unmapped_members = report.unmapped_members.len(),
        changed_members = report.changed_members.len(),
        missing_associations = report.missing_associations.len(),
        changed_associations = report.changed_associations.len(),
        "drift detected"
    );
    report
}
