//! Entity set and column drift

use tracing::debug;

use super::options::{DriftOptions, ExclusionSet, StoreGeneratedPolicy};
use super::types::{ChangedMember, MemberDifference, UnmappedMember};
use crate::model::{ColumnMember, EdmxModel, EntitySet, EntityType, Layer, Property, PropertyOwner};
use crate::util::eq_ci;

/// Storage entity sets read by no entity set mapping fragment and no
/// association set mapping.
pub fn unmapped_entity_sets(model: &EdmxModel, exclude_sets: &ExclusionSet) -> Vec<EntitySet> {
    model
        .entity_sets(Layer::Storage)
        .into_iter()
        .filter(|&set| !exclude_sets.contains(&model.name(set)))
        .filter(|&set| model.mappings_for_store_set(set).is_empty())
        .collect()
}

/// A storage set with its table, kept only if neither is excluded.
fn store_tables<'a>(
    model: &'a EdmxModel,
    exclude_sets: &'a ExclusionSet,
    exclude_types: &'a ExclusionSet,
) -> impl Iterator<Item = (EntitySet, EntityType)> + 'a {
    model
        .entity_sets(Layer::Storage)
        .into_iter()
        .filter(|&set| !exclude_sets.contains(&model.name(set)))
        .filter_map(|set| model.entity_set_type(set).map(|table| (set, table)))
        .filter(|&(_, table)| !exclude_types.contains(&model.name(table)))
}

/// Columns of mapped entity sets that no property mapping and no condition
/// reads.
///
/// Sets mapped only through association set mappings (junction tables) and
/// sets that carry any association set mapping are skipped.
pub fn unmapped_scalar_members(
    model: &EdmxModel,
    exclude_sets: &ExclusionSet,
    exclude_types: &ExclusionSet,
    exclude_members: &ExclusionSet,
) -> Vec<UnmappedMember> {
    let mut unmapped = Vec::new();
    for (set, table) in store_tables(model, exclude_sets, exclude_types) {
        let mappings = model.mappings_for_store_set(set);
        if mappings.fragments.is_empty() || !mappings.association_set_mappings.is_empty() {
            continue;
        }
        let set_name = model.name(set);
        for column in model.properties(table) {
            if exclude_members.contains_member(&set_name, &model.name(column)) {
                continue;
            }
            if model.members_for_column(column).is_empty()
                && model.conditions_for_column(column).is_empty()
            {
                debug!(set = %set_name, column = %model.name(column), "unmapped column");
                unmapped.push(UnmappedMember {
                    store_set: set,
                    column,
                });
            }
        }
    }
    unmapped
}

/// Mapped columns whose enabled attributes differ from at least one linked
/// entity type property. Properties of complex types are not compared.
pub fn changed_scalar_members(
    model: &EdmxModel,
    options: &DriftOptions,
    exclude_sets: &ExclusionSet,
    exclude_types: &ExclusionSet,
    exclude_members: &ExclusionSet,
) -> Vec<ChangedMember> {
    let mut changed = Vec::new();
    for (set, table) in store_tables(model, exclude_sets, exclude_types) {
        if model.mappings_for_store_set(set).fragments.is_empty() {
            continue;
        }
        let set_name = model.name(set);
        for column in model.properties(table) {
            if exclude_members.contains_member(&set_name, &model.name(column)) {
                continue;
            }
            let mut entry = ChangedMember {
                store_set: set,
                column,
                properties: Vec::new(),
                differences: Vec::new(),
            };
            for (property, owner) in linked_properties(model, column) {
                let differences = compare_member(model, options, column, property, owner);
                if differences.is_empty() {
                    continue;
                }
                entry.properties.push(property);
                for difference in differences {
                    if !entry.differences.contains(&difference) {
                        entry.differences.push(difference);
                    }
                }
            }
            if !entry.properties.is_empty() {
                debug!(
                    set = %set_name,
                    column = %model.name(column),
                    properties = entry.properties.len(),
                    "changed column"
                );
                changed.push(entry);
            }
        }
    }
    changed
}

/// Entity type properties mapped to `column`, with their declaring type.
fn linked_properties(model: &EdmxModel, column: Property) -> Vec<(Property, EntityType)> {
    model
        .members_for_column(column)
        .into_iter()
        .filter_map(|member| match member {
            ColumnMember::Property(property) => match model.property_owner(property) {
                Some(PropertyOwner::Entity(owner)) => Some((property, owner)),
                _ => None,
            },
            ColumnMember::Association(_) => None,
        })
        .collect()
}

fn compare_member(
    model: &EdmxModel,
    options: &DriftOptions,
    column: Property,
    property: Property,
    owner: EntityType,
) -> Vec<MemberDifference> {
    let mut differences = Vec::new();

    if options.compare_key_membership && model.is_key_member(column) != model.is_key_member(property) {
        differences.push(MemberDifference::KeyMembership);
    }

    if options.compare_member_type
        && !model
            .type_descriptor(column)
            .is_equivalent(&model.type_descriptor(property))
    {
        differences.push(MemberDifference::Type);
    }

    let skip_pattern = options.store_generated_policy
        == StoreGeneratedPolicy::SkipInheritanceHierarchies
        && model.has_inheritance(owner);
    if options.compare_store_generated_pattern && !skip_pattern {
        let pattern = |p: Property| model.store_generated_pattern(p).unwrap_or("None");
        if !eq_ci(pattern(column), pattern(property)) {
            differences.push(MemberDifference::StoreGeneratedPattern);
        }
    }

    if options.compare_default_value
        && !same_optional(model.default_value(column), model.default_value(property))
    {
        differences.push(MemberDifference::DefaultValue);
    }

    if options.compare_collation && !same_optional(model.collation(column), model.collation(property)) {
        differences.push(MemberDifference::Collation);
    }

    differences
}

fn same_optional(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => eq_ci(a, b),
        _ => false,
    }
}
