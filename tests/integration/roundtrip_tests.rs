//! Save/load round trips through a temporary directory

use pretty_assertions::assert_eq;
use rust_edmx::drift::{changed_scalar_members, DriftOptions, ExclusionSet};
use rust_edmx::model::{Layer, PropertySpec};
use rust_edmx::{detect_drift, EdmxModel, EdmxVersion, Exclusions};

use crate::common::{column, entity_type, fixture_path, reload, sales_model, TestContext};

#[test]
fn test_fixture_survives_round_trip() {
    let (ctx, path) = TestContext::with_fixture("shop.edmx");
    let model = reload(&path);
    let copy = ctx.round_trip(&model, "copy.edmx");

    assert_eq!(copy.version(), EdmxVersion::V3);
    assert_eq!(copy.tree().len(), model.tree().len());
    assert!(copy.resolve_all().is_empty());

    let before = detect_drift(&model, &DriftOptions::default(), &Exclusions::default());
    let after = detect_drift(&copy, &DriftOptions::default(), &Exclusions::default());
    assert_eq!(after.unmapped_entity_sets.len(), before.unmapped_entity_sets.len());
    assert_eq!(after.changed_members.len(), before.changed_members.len());
}

#[test]
fn test_designer_section_is_preserved() {
    let ctx = TestContext::new();
    let model = EdmxModel::load(fixture_path("shop.edmx")).unwrap();
    let copy = ctx.round_trip(&model, "designer.edmx");
    let text = copy.to_xml_string().unwrap();
    assert!(text.contains("<edmx:Designer"));
    assert!(text.contains("annotation:StoreGeneratedPattern=\"Identity\""));
}

#[test]
fn test_rename_is_persisted() {
    let (_ctx, path) = TestContext::with_fixture("shop.edmx");
    let mut model = reload(&path);
    let order = entity_type(&model, "Order");
    model.rename(order, "Purchase").unwrap();
    model.save(&path).unwrap();

    let saved = reload(&path);
    let purchase = saved.find_entity_type(Layer::Conceptual, "Purchase").unwrap();
    assert!(saved.find_entity_type(Layer::Conceptual, "Order").is_none());
    let etm = saved.type_mappings_of(purchase)[0];
    assert_eq!(saved.attribute(etm, "TypeName"), Some("ShopModel.Purchase"));
    assert!(saved.resolve_all().is_empty());
}

#[test]
fn test_model_built_in_memory_round_trips() {
    let ctx = TestContext::new();
    let model = sales_model(2);
    let copy = ctx.round_trip(&model, "sales.edmx");

    assert!(copy.resolve_all().is_empty());
    assert_eq!(
        copy.container_name(Layer::Conceptual).as_deref(),
        Some("SalesEntities")
    );
    let changed = changed_scalar_members(
        &copy,
        &DriftOptions::default(),
        &ExclusionSet::new(),
        &ExclusionSet::new(),
        &ExclusionSet::new(),
    );
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].column, column(&copy, "Orders", "Amount"));
}

#[test]
fn test_added_members_are_written_in_schema_order() {
    let ctx = TestContext::new();
    let mut model = EdmxModel::load(fixture_path("shop.edmx")).unwrap();
    let order = entity_type(&model, "Order");
    model
        .add_property(order, &PropertySpec::new("Placed", "DateTime").nullable(false))
        .unwrap();

    let copy = ctx.round_trip(&model, "placed.edmx");
    let order = entity_type(&copy, "Order");
    let names: Vec<String> = copy
        .properties(order)
        .into_iter()
        .map(|p| copy.name(p))
        .collect();
    assert_eq!(names, vec!["Id", "CustomerId", "Amount", "Notes", "Placed"]);

    // Properties precede navigation properties in the saved document.
    let text = copy.to_xml_string().unwrap();
    let placed = text.find("Name=\"Placed\"").unwrap();
    let navigation = text.find("<NavigationProperty Name=\"Customer\"").unwrap();
    assert!(placed < navigation);
}

#[test]
fn test_windows_1252_file_loads() {
    let ctx = TestContext::new();
    let text = std::fs::read_to_string(fixture_path("shop.edmx"))
        .unwrap()
        .replace("Name=\"Message\"", "Name=\"Café\"");
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
    let path = ctx.path("latin.edmx");
    std::fs::write(&path, &bytes).unwrap();

    let model = reload(&path);
    let table = model.find_entity_type(Layer::Storage, "AuditLog").unwrap();
    assert!(model.find_property(table, "Café").is_some());
}

#[test]
fn test_load_missing_file_fails() {
    let ctx = TestContext::new();
    assert!(EdmxModel::load(ctx.path("missing.edmx")).is_err());
}
