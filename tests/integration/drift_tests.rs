//! Drift detection over the shop fixture and models built through the API

use pretty_assertions::assert_eq;
use rust_edmx::drift::{
    changed_associations, changed_scalar_members, missing_associations, unmapped_entity_sets,
    unmapped_scalar_members, AssociationChange, DriftOptions, ExclusionSet, Exclusions,
    MemberDifference, StoreGeneratedPolicy,
};
use rust_edmx::model::{
    AssociationSpec, EndSpec, EntitySet, Layer, Multiplicity, Property, PropertySpec,
    ReferentialConstraint,
};
use rust_edmx::{check_file, detect_drift, CheckOptions, EdmxModel};

use crate::common::{
    column, entity_type, fixture_path, load_fixture, map_orders, sales_model, sales_schema,
    storage_table, store_set,
};

fn names(model: &EdmxModel, sets: &[EntitySet]) -> Vec<String> {
    sets.iter().map(|&s| model.name(s)).collect()
}

fn column_names(model: &EdmxModel, columns: &[Property]) -> Vec<String> {
    columns.iter().map(|&c| model.name(c)).collect()
}

fn none() -> ExclusionSet {
    ExclusionSet::new()
}

// ============================================================================
// Shop fixture
// ============================================================================

#[test]
fn test_fixture_unmapped_entity_sets() {
    let model = load_fixture("shop.edmx");
    let unmapped = unmapped_entity_sets(&model, &none());
    assert_eq!(names(&model, &unmapped), vec!["AuditLog"]);
}

#[test]
fn test_fixture_junction_table_is_mapped() {
    let model = load_fixture("shop.edmx");
    let unmapped = unmapped_entity_sets(&model, &none());
    assert!(!unmapped.contains(&store_set(&model, "OrderTags")));
}

#[test]
fn test_fixture_unmapped_columns() {
    let model = load_fixture("shop.edmx");
    let unmapped = unmapped_scalar_members(&model, &none(), &none(), &none());
    assert_eq!(unmapped.len(), 1);
    assert_eq!(unmapped[0].store_set, store_set(&model, "Orders"));
    assert_eq!(model.name(unmapped[0].column), "Legacy");
}

#[test]
fn test_fixture_changed_columns() {
    let model = load_fixture("shop.edmx");
    let changed = changed_scalar_members(&model, &DriftOptions::default(), &none(), &none(), &none());
    assert_eq!(changed.len(), 1);

    let amount = &changed[0];
    assert_eq!(amount.column, column(&model, "Orders", "Amount"));
    let order = entity_type(&model, "Order");
    assert_eq!(amount.properties, vec![model.find_property(order, "Amount").unwrap()]);
    assert_eq!(amount.differences, vec![MemberDifference::Type]);
}

#[test]
fn test_fixture_missing_associations() {
    let model = load_fixture("shop.edmx");
    let missing = missing_associations(&model, &none(), &none());
    let names: Vec<String> = missing.iter().map(|&a| model.name(a)).collect();

    // FK_PremiumCustomers_Customers only expresses the subtype table and
    // FK_OrderTags_* are covered by the many-to-many association.
    assert_eq!(names, vec!["FK_Customers_Regions"]);
}

#[test]
fn test_fixture_changed_associations() {
    let model = load_fixture("shop.edmx");
    assert!(changed_associations(&model, &none(), &none()).is_empty());
}

#[test]
fn test_detect_drift_collects_every_query() {
    let model = load_fixture("shop.edmx");
    let report = detect_drift(&model, &DriftOptions::default(), &Exclusions::default());
    assert!(report.has_drift());
    assert_eq!(report.unmapped_entity_sets.len(), 1);
    assert_eq!(report.unmapped_members.len(), 1);
    assert_eq!(report.changed_members.len(), 1);
    assert_eq!(report.missing_associations.len(), 1);
    assert!(report.changed_associations.is_empty());
}

#[test]
fn test_exclusions_silence_every_query() {
    let model = load_fixture("shop.edmx");
    let exclusions = Exclusions {
        sets: ["auditlog"].into_iter().collect(),
        types: ["Orders"].into_iter().collect(),
        members: ["Orders.Legacy"].into_iter().collect(),
        associations: ["FK_Customers_Regions"].into_iter().collect(),
    };
    let report = detect_drift(&model, &DriftOptions::default(), &exclusions);
    assert!(!report.has_drift(), "{report:?}");
}

#[test]
fn test_member_exclusion_by_bare_name() {
    let model = load_fixture("shop.edmx");
    let members: ExclusionSet = ["LEGACY"].into_iter().collect();
    assert!(unmapped_scalar_members(&model, &none(), &none(), &members).is_empty());
}

#[test]
fn test_disabled_comparison_hides_type_change() {
    let model = load_fixture("shop.edmx");
    let options = DriftOptions {
        compare_member_type: false,
        ..DriftOptions::default()
    };
    assert!(changed_scalar_members(&model, &options, &none(), &none(), &none()).is_empty());
}

#[test]
fn test_store_generated_policy_compare_all() {
    let model = load_fixture("shop.edmx");
    let options = DriftOptions {
        compare_member_type: false,
        store_generated_policy: StoreGeneratedPolicy::CompareAll,
        ..DriftOptions::default()
    };
    let changed = changed_scalar_members(&model, &options, &none(), &none(), &none());

    // The subtype table's key is not an identity column, but the inherited
    // Customer.Id is.
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].column, column(&model, "PremiumCustomers", "Id"));
    assert_eq!(
        changed[0].differences,
        vec![MemberDifference::StoreGeneratedPattern]
    );
}

#[test]
fn test_check_file_reports_drift() {
    let options = CheckOptions {
        path: fixture_path("shop.edmx"),
        ..CheckOptions::default()
    };
    let report = check_file(&options).unwrap();
    assert_eq!(report.unmapped_entity_sets.len(), 1);
    assert_eq!(report.missing_associations.len(), 1);
}

#[test]
fn test_check_file_missing_path() {
    let options = CheckOptions {
        path: fixture_path("does-not-exist.edmx"),
        ..CheckOptions::default()
    };
    assert!(check_file(&options).is_err());
}

// ============================================================================
// Models built through the API
// ============================================================================

#[test]
fn test_unmapped_set_disappears_once_mapped() {
    let mut model = sales_schema(4);
    let unmapped = unmapped_entity_sets(&model, &none());
    assert_eq!(names(&model, &unmapped), vec!["Orders"]);

    map_orders(&mut model);
    assert!(unmapped_entity_sets(&model, &none()).is_empty());
}

#[test]
fn test_unmapped_set_is_not_scanned_for_columns() {
    let model = sales_schema(4);
    assert!(unmapped_scalar_members(&model, &none(), &none(), &none()).is_empty());
}

#[test]
fn test_money_against_decimal_scale() {
    let model = sales_model(2);
    let changed = changed_scalar_members(&model, &DriftOptions::default(), &none(), &none(), &none());
    assert_eq!(changed.len(), 1);
    assert_eq!(model.name(changed[0].column), "Amount");
    let order = entity_type(&model, "Order");
    assert_eq!(changed[0].properties, vec![model.find_property(order, "Amount").unwrap()]);

    let options = DriftOptions {
        compare_member_type: false,
        ..DriftOptions::default()
    };
    assert!(changed_scalar_members(&model, &options, &none(), &none(), &none()).is_empty());

    let matching = sales_model(4);
    assert!(changed_scalar_members(&matching, &DriftOptions::default(), &none(), &none(), &none())
        .is_empty());
}

#[test]
fn test_key_membership_difference() {
    let mut model = sales_model(4);
    let amount = column(&model, "Orders", "Amount");
    model.set_key_member(amount, true).unwrap();

    let changed = changed_scalar_members(&model, &DriftOptions::default(), &none(), &none(), &none());
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].differences, vec![MemberDifference::KeyMembership]);
}

#[test]
fn test_default_value_and_collation_differences() {
    let mut model = sales_model(4);
    let customers = storage_table(&model, "Customers");
    let customer = entity_type(&model, "Customer");
    let column = model
        .add_property(
            customers,
            &PropertySpec::new("Code", "varchar")
                .max_length("10")
                .default_value("'A'")
                .collation("Latin1_General_CI_AS"),
        )
        .unwrap();
    let property = model
        .add_property(
            customer,
            &PropertySpec::new("Code", "String")
                .max_length("10")
                .unicode(false)
                .fixed_length(false),
        )
        .unwrap();
    let fragment = model
        .type_mappings_of(customer)
        .into_iter()
        .flat_map(|m| model.mapping_fragments(m))
        .next()
        .unwrap();
    model.add_scalar_mapping(fragment, property, column).unwrap();

    let changed = changed_scalar_members(&model, &DriftOptions::default(), &none(), &none(), &none());
    assert_eq!(changed.len(), 1);
    assert_eq!(
        changed[0].differences,
        vec![MemberDifference::DefaultValue, MemberDifference::Collation]
    );
}

/// Add a Regions table referenced from Customers, mapped in both layers,
/// with no conceptual association for the foreign key.
fn add_regions(model: &mut EdmxModel) {
    let regions = model.add_entity_type(Layer::Storage, "Regions").unwrap();
    let id = model
        .add_property(regions, &PropertySpec::new("Id", "int").nullable(false))
        .unwrap();
    model.set_key_member(id, true).unwrap();
    let customers = storage_table(model, "Customers");
    let region_id = model
        .add_property(customers, &PropertySpec::new("RegionId", "int"))
        .unwrap();
    model
        .add_association(
            Layer::Storage,
            &AssociationSpec {
                name: "FK_Customers_Regions".to_string(),
                ends: [
                    EndSpec::new("Regions", regions, Multiplicity::ZeroOrOne),
                    EndSpec::new("Customers", customers, Multiplicity::Many),
                ],
                constraint: Some(ReferentialConstraint {
                    principal_role: "Regions".to_string(),
                    principal_properties: vec!["Id".to_string()],
                    dependent_role: "Customers".to_string(),
                    dependent_properties: vec!["RegionId".to_string()],
                }),
            },
        )
        .unwrap();
    let store = model.add_entity_set("Regions", regions).unwrap();

    let region = model.add_entity_type(Layer::Conceptual, "Region").unwrap();
    let region_key = model
        .add_property(region, &PropertySpec::new("Id", "Int32").nullable(false))
        .unwrap();
    model.set_key_member(region_key, true).unwrap();
    let set = model.add_entity_set("Regions", region).unwrap();
    let esm = model.add_entity_set_mapping(set).unwrap();
    let etm = model.add_entity_type_mapping(esm, region, false).unwrap();
    let fragment = model.add_mapping_fragment(etm, store).unwrap();
    model.add_scalar_mapping(fragment, region_key, id).unwrap();

    let customer = entity_type(model, "Customer");
    let customer_region = model
        .add_property(customer, &PropertySpec::new("RegionId", "Int32"))
        .unwrap();
    let customer_fragment = model
        .type_mappings_of(customer)
        .into_iter()
        .flat_map(|m| model.mapping_fragments(m))
        .next()
        .unwrap();
    model
        .add_scalar_mapping(customer_fragment, customer_region, region_id)
        .unwrap();
}

#[test]
fn test_foreign_key_without_counterpart_is_reported_once() {
    let mut model = sales_model(4);
    add_order_association(&mut model, "CustomerId");
    add_regions(&mut model);

    let missing = missing_associations(&model, &none(), &none());
    let names: Vec<String> = missing.iter().map(|&a| model.name(a)).collect();
    assert_eq!(names, vec!["FK_Customers_Regions"]);

    let excluded: ExclusionSet = ["Regions"].into_iter().collect();
    assert!(missing_associations(&model, &excluded, &none()).is_empty());
}

#[test]
fn test_foreign_key_to_unmapped_set_is_ignored() {
    let model = sales_schema(4);
    assert!(missing_associations(&model, &none(), &none()).is_empty());
}

fn add_order_association(model: &mut EdmxModel, dependent_property: &str) {
    let customer = entity_type(model, "Customer");
    let order = entity_type(model, "Order");
    model
        .add_association(
            Layer::Conceptual,
            &AssociationSpec {
                name: "FK_Orders_Customers".to_string(),
                ends: [
                    EndSpec::new("Customer", customer, Multiplicity::One),
                    EndSpec::new("Order", order, Multiplicity::Many),
                ],
                constraint: Some(ReferentialConstraint {
                    principal_role: "Customer".to_string(),
                    principal_properties: vec!["Id".to_string()],
                    dependent_role: "Order".to_string(),
                    dependent_properties: vec![dependent_property.to_string()],
                }),
            },
        )
        .unwrap();
}

#[test]
fn test_matching_foreign_key_association() {
    let mut model = sales_model(4);
    assert_eq!(missing_associations(&model, &none(), &none()).len(), 1);

    add_order_association(&mut model, "CustomerId");
    assert!(missing_associations(&model, &none(), &none()).is_empty());
    assert!(changed_associations(&model, &none(), &none()).is_empty());
}

#[test]
fn test_dependent_keys_differ() {
    let mut model = sales_model(4);
    add_order_association(&mut model, "Id");

    let changed = changed_associations(&model, &none(), &none());
    assert_eq!(changed.len(), 1);
    assert_eq!(model.name(changed[0].storage), "FK_Orders_Customers");
    assert_eq!(model.layer(changed[0].conceptual), Layer::Conceptual);
    assert_eq!(changed[0].reason, AssociationChange::DependentKeysDiffer);

    let skip: ExclusionSet = ["fk_orders_customers"].into_iter().collect();
    assert!(changed_associations(&model, &none(), &skip).is_empty());
}

#[test]
fn test_key_count_differs() {
    let mut model = sales_model(4);
    let customer = entity_type(&model, "Customer");
    let order = entity_type(&model, "Order");
    model
        .add_association(
            Layer::Conceptual,
            &AssociationSpec {
                name: "FK_Orders_Customers".to_string(),
                ends: [
                    EndSpec::new("Customer", customer, Multiplicity::One),
                    EndSpec::new("Order", order, Multiplicity::Many),
                ],
                constraint: Some(ReferentialConstraint {
                    principal_role: "Customer".to_string(),
                    principal_properties: vec!["Id".to_string(), "Name".to_string()],
                    dependent_role: "Order".to_string(),
                    dependent_properties: vec!["CustomerId".to_string(), "Amount".to_string()],
                }),
            },
        )
        .unwrap();

    let changed = changed_associations(&model, &none(), &none());
    assert_eq!(changed.len(), 1);
    assert_eq!(
        changed[0].reason,
        AssociationChange::KeyCountDiffers {
            storage: 1,
            conceptual: 2
        }
    );
}

#[test]
fn test_renamed_column_follows_through_drift() {
    let mut model = sales_model(2);
    let amount = column(&model, "Orders", "Amount");
    model.rename(amount, "Total").unwrap();

    let changed = changed_scalar_members(&model, &DriftOptions::default(), &none(), &none(), &none());
    assert_eq!(column_names(&model, &[changed[0].column]), vec!["Total"]);
    assert!(unmapped_scalar_members(&model, &none(), &none(), &none()).is_empty());
}
