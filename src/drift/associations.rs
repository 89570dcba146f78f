//! Foreign key drift between storage and conceptual associations

use tracing::debug;

use super::options::ExclusionSet;
use super::types::{AssociationChange, ChangedAssociation};
use crate::model::{Association, EdmxModel, EntitySet, EntityType, Layer, Property};
use crate::util::eq_ci;

/// A storage association read through its referential constraint.
#[derive(Debug, Clone)]
struct ForeignKey {
    association: Association,
    principal_table: EntityType,
    dependent_table: EntityType,
    principal_columns: Vec<Property>,
    dependent_columns: Vec<Property>,
}

impl ForeignKey {
    fn read(model: &EdmxModel, association: Association) -> Option<Self> {
        let constraint = model.referential_constraint(association)?;
        let (principal_end, dependent_end) = model.constraint_ends(association)?;
        let principal_table = model.end_type(principal_end)?;
        let dependent_table = model.end_type(dependent_end)?;
        let columns = |table: EntityType, names: &[String]| -> Vec<Property> {
            names
                .iter()
                .filter_map(|name| model.find_property(table, name))
                .collect()
        };
        Some(Self {
            association,
            principal_columns: columns(principal_table, &constraint.principal_properties),
            dependent_columns: columns(dependent_table, &constraint.dependent_properties),
            principal_table,
            dependent_table,
        })
    }
}

/// First storage set over `table` that some mapping reads.
fn mapped_set(model: &EdmxModel, table: EntityType) -> Option<EntitySet> {
    model
        .entity_sets_of(table)
        .into_iter()
        .find(|&set| !model.mappings_for_store_set(set).is_empty())
}

/// Storage foreign keys between two mapped, non-excluded sets.
fn mapped_foreign_keys(
    model: &EdmxModel,
    exclude_sets: &ExclusionSet,
    exclude_associations: &ExclusionSet,
) -> Vec<(ForeignKey, EntitySet, EntitySet)> {
    let mut keys = Vec::new();
    for association in model.associations(Layer::Storage) {
        if exclude_associations.contains(&model.name(association)) {
            continue;
        }
        let Some(fk) = ForeignKey::read(model, association) else {
            debug!(association = %model.name(association), "storage association without constraint");
            continue;
        };
        let (Some(principal_set), Some(dependent_set)) = (
            mapped_set(model, fk.principal_table),
            mapped_set(model, fk.dependent_table),
        ) else {
            continue;
        };
        if exclude_sets.contains(&model.name(principal_set))
            || exclude_sets.contains(&model.name(dependent_set))
        {
            continue;
        }
        keys.push((fk, principal_set, dependent_set));
    }
    keys
}

/// Conceptual types whose fragments read `table`.
fn types_mapped_to_table(model: &EdmxModel, table: EntityType) -> Vec<EntityType> {
    let mut types = Vec::new();
    for set in model.entity_sets_of(table) {
        for t in model.types_mapped_to(set) {
            if !types.contains(&t) {
                types.push(t);
            }
        }
    }
    types
}

/// `entity_type` is, derives from, or is a base of a type mapped to `table`.
fn corresponds(model: &EdmxModel, entity_type: EntityType, table: EntityType) -> bool {
    types_mapped_to_table(model, table)
        .into_iter()
        .any(|t| model.derives_from(t, entity_type) || model.derives_from(entity_type, t))
}

/// A property of `entity_type` or one of its base types.
fn hierarchy_property(model: &EdmxModel, entity_type: EntityType, name: &str) -> Option<Property> {
    model
        .property_in_hierarchy(entity_type.0, name)
        .map(Property)
}

/// The conceptual association expressing the same relationship as `fk`.
fn counterpart(model: &EdmxModel, fk: &ForeignKey, dependent_set: EntitySet) -> Option<Association> {
    if let Some(same_name) = model.find_association(Layer::Conceptual, &model.name(fk.association)) {
        return Some(same_name);
    }

    // Independent associations and junction tables are mapped by an
    // association set mapping over the dependent table.
    let mut fallback = None;
    for mapping in model.mappings_for_store_set(dependent_set).association_set_mappings {
        let Some(association) = model.mapped_association(mapping) else {
            continue;
        };
        let touches_principal = model
            .association_ends(association)
            .into_iter()
            .filter_map(|end| model.end_type(end))
            .any(|t| corresponds(model, t, fk.principal_table));
        if !touches_principal {
            continue;
        }
        let overlaps = model
            .scalar_mappings(mapping)
            .into_iter()
            .filter_map(|m| model.mapped_column(m))
            .any(|c| fk.dependent_columns.contains(&c));
        if overlaps {
            return Some(association);
        }
        if fallback.is_none() {
            fallback = Some(association);
        }
    }
    if fallback.is_some() {
        return fallback;
    }

    model
        .associations(Layer::Conceptual)
        .into_iter()
        .find(|&association| constraint_matches(model, fk, association))
}

/// A conceptual foreign key association between the mapped types whose
/// dependent properties map onto the storage dependent columns.
fn constraint_matches(model: &EdmxModel, fk: &ForeignKey, association: Association) -> bool {
    let (Some(constraint), Some((principal_end, dependent_end))) = (
        model.referential_constraint(association),
        model.constraint_ends(association),
    ) else {
        return false;
    };
    let (Some(principal_type), Some(dependent_type)) =
        (model.end_type(principal_end), model.end_type(dependent_end))
    else {
        return false;
    };
    if !corresponds(model, principal_type, fk.principal_table)
        || !corresponds(model, dependent_type, fk.dependent_table)
    {
        return false;
    }
    constraint
        .dependent_properties
        .iter()
        .filter_map(|name| hierarchy_property(model, dependent_type, name))
        .flat_map(|p| model.columns_for_property(p))
        .any(|c| fk.dependent_columns.contains(&c))
}

/// The foreign key only expresses a subtype stored in its own table: it
/// covers the dependent table's whole key and the dependent table maps a
/// type deriving from one mapped to the principal table.
fn is_inheritance_constraint(model: &EdmxModel, fk: &ForeignKey) -> bool {
    let key = model.key_properties(fk.dependent_table);
    let whole_key = !key.is_empty()
        && key.len() == fk.dependent_columns.len()
        && key.iter().all(|k| fk.dependent_columns.contains(k));
    if !whole_key {
        return false;
    }
    let principal_types = types_mapped_to_table(model, fk.principal_table);
    types_mapped_to_table(model, fk.dependent_table)
        .into_iter()
        .any(|d| {
            principal_types
                .iter()
                .any(|&p| p != d && model.derives_from(d, p))
        })
}

/// Storage associations between mapped entity sets that have no conceptual
/// counterpart. Inheritance constraints are not reported.
pub fn missing_associations(
    model: &EdmxModel,
    exclude_sets: &ExclusionSet,
    exclude_associations: &ExclusionSet,
) -> Vec<Association> {
    let mut missing = Vec::new();
    for (fk, _, dependent_set) in mapped_foreign_keys(model, exclude_sets, exclude_associations) {
        if is_inheritance_constraint(model, &fk) {
            debug!(association = %model.name(fk.association), "inheritance constraint");
            continue;
        }
        if counterpart(model, &fk, dependent_set).is_none() {
            debug!(association = %model.name(fk.association), "missing association");
            missing.push(fk.association);
        }
    }
    missing
}

/// Names a storage column list is compared against: the columns of `table`
/// each conceptual property is mapped to, or the property name itself when
/// it maps to none there.
fn conceptual_columns(
    model: &EdmxModel,
    entity_type: EntityType,
    table: EntityType,
    properties: &[String],
) -> Vec<String> {
    let mut names = Vec::new();
    for name in properties {
        let mapped: Vec<String> = hierarchy_property(model, entity_type, name)
            .map(|p| model.columns_for_property(p))
            .unwrap_or_default()
            .into_iter()
            .filter(|&c| model.parent_of(c.0) == Some(table.0))
            .map(|c| model.name(c))
            .collect();
        if mapped.is_empty() {
            names.push(name.clone());
        } else {
            names.extend(mapped);
        }
    }
    names
}

fn covered(model: &EdmxModel, columns: &[Property], names: &[String]) -> bool {
    columns
        .iter()
        .all(|&c| names.iter().any(|n| eq_ci(n, &model.name(c))))
}

/// Storage associations whose conceptual counterpart pairs different keys.
///
/// Many-to-many counterparts and junction tables are skipped, as are
/// counterparts without a referential constraint.
pub fn changed_associations(
    model: &EdmxModel,
    exclude_sets: &ExclusionSet,
    exclude_associations: &ExclusionSet,
) -> Vec<ChangedAssociation> {
    let mut changed = Vec::new();
    for (fk, _, dependent_set) in mapped_foreign_keys(model, exclude_sets, exclude_associations) {
        let Some(conceptual) = counterpart(model, &fk, dependent_set) else {
            continue;
        };
        let dependent_mappings = model.mappings_for_store_set(dependent_set);
        if model.is_many_to_many(conceptual) || dependent_mappings.fragments.is_empty() {
            continue;
        }
        let (Some(constraint), Some((principal_end, dependent_end))) = (
            model.referential_constraint(conceptual),
            model.constraint_ends(conceptual),
        ) else {
            continue;
        };
        if constraint.dependent_properties.is_empty() {
            continue;
        }
        let (Some(principal_type), Some(dependent_type)) =
            (model.end_type(principal_end), model.end_type(dependent_end))
        else {
            continue;
        };

        let storage_pairs = fk.dependent_columns.len();
        let conceptual_pairs = constraint.dependent_properties.len();
        let reason = if storage_pairs != conceptual_pairs {
            Some(AssociationChange::KeyCountDiffers {
                storage: storage_pairs,
                conceptual: conceptual_pairs,
            })
        } else if !covered(
            model,
            &fk.principal_columns,
            &conceptual_columns(model, principal_type, fk.principal_table, &constraint.principal_properties),
        ) {
            Some(AssociationChange::PrincipalKeysDiffer)
        } else if !covered(
            model,
            &fk.dependent_columns,
            &conceptual_columns(model, dependent_type, fk.dependent_table, &constraint.dependent_properties),
        ) {
            Some(AssociationChange::DependentKeysDiffer)
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(
                storage = %model.name(fk.association),
                conceptual = %model.name(conceptual),
                %reason,
                "changed association"
            );
            changed.push(ChangedAssociation {
                storage: fk.association,
                conceptual,
                reason,
            });
        }
    }
    changed
}
