//! Editing through the model API: mapping conditions, renames, removals,
//! function imports and association set mappings

use pretty_assertions::assert_eq;
use rust_edmx::model::{
    AssociationSpec, ColumnMember, ConditionValue, EndSpec, FunctionSpec, Layer, Multiplicity,
    Notification, ObjectKind, ParameterMode,
};
use rust_edmx::EdmxError;

use crate::common::{column, entity_type, load_fixture, sales_model, sales_schema, store_set};

// ============================================================================
// Conditions
// ============================================================================

#[test]
fn test_condition_without_fragment_is_rejected() {
    let mut model = sales_schema(4);
    let customer = entity_type(&model, "Customer");
    let etm = model.type_mappings_of(customer)[0];
    let orders = store_set(&model, "Orders");
    let before = model.to_xml_string().unwrap();

    let err = model
        .add_condition(etm, orders, "Amount", ConditionValue::Equals("0".to_string()))
        .unwrap_err();
    assert!(matches!(err, EdmxError::InvalidReference { .. }), "{err}");
    assert_eq!(model.to_xml_string().unwrap(), before);
}

#[test]
fn test_condition_on_unknown_column_is_rejected() {
    let mut model = sales_schema(4);
    let customer = entity_type(&model, "Customer");
    let etm = model.type_mappings_of(customer)[0];
    let customers = store_set(&model, "Customers");
    let before = model.to_xml_string().unwrap();

    let err = model
        .add_condition(etm, customers, "Kind", ConditionValue::IsNull(false))
        .unwrap_err();
    assert!(matches!(err, EdmxError::InvalidReference { .. }));
    assert_eq!(model.to_xml_string().unwrap(), before);
}

#[test]
fn test_condition_is_added_to_matching_fragment() {
    let mut model = sales_schema(4);
    let customer = entity_type(&model, "Customer");
    let etm = model.type_mappings_of(customer)[0];
    let customers = store_set(&model, "Customers");

    let condition = model
        .add_condition(etm, customers, "Name", ConditionValue::IsNull(false))
        .unwrap();
    assert_eq!(model.condition_value(condition), Some(ConditionValue::IsNull(false)));
    assert_eq!(model.mapped_column(condition), Some(column(&model, "Customers", "Name")));

    let fragment = model.mapping_fragments(etm)[0];
    assert_eq!(model.conditions(fragment), vec![condition]);
    assert_eq!(
        model.conditions_for_column(column(&model, "Customers", "Name")),
        vec![condition]
    );
}

#[test]
fn test_condition_requires_column_name() {
    let mut model = sales_schema(4);
    let customer = entity_type(&model, "Customer");
    let etm = model.type_mappings_of(customer)[0];
    let customers = store_set(&model, "Customers");
    let err = model
        .add_condition(etm, customers, "", ConditionValue::Equals("A".to_string()))
        .unwrap_err();
    assert!(matches!(err, EdmxError::MissingArgument { .. }));
}

// ============================================================================
// Rename and remove across layers
// ============================================================================

#[test]
fn test_rename_conceptual_set_updates_mapping_and_import() {
    let mut model = load_fixture("shop.edmx");
    let orders = model.find_entity_set(Layer::Conceptual, "Orders").unwrap();
    let import = model.find_function_import("GetRecentOrders").unwrap();
    assert_eq!(model.function_import_entity_set(import), Some(orders));

    let log = model.rename(orders, "Purchases").unwrap();
    assert_eq!(
        log[0],
        Notification::Renamed {
            object: orders.into(),
            kind: ObjectKind::EntitySet,
            old_name: "Orders".to_string(),
            new_name: "Purchases".to_string(),
        }
    );

    let esm = model.find_entity_set_mapping("Purchases").unwrap();
    assert_eq!(model.mapped_entity_set(esm), Some(orders));
    assert!(model.find_entity_set_mapping("Orders").is_none());
    assert_eq!(model.attribute(import, "EntitySet"), Some("Purchases"));
    assert_eq!(model.function_import_entity_set(import), Some(orders));

    let set = model.find_association_set(Layer::Conceptual, "OrderTags").unwrap();
    let ends: Vec<_> = model
        .association_set_ends(set)
        .into_iter()
        .map(|end| model.attribute(end, "EntitySet").unwrap_or_default().to_string())
        .collect();
    assert_eq!(ends, vec!["Purchases", "Tags"]);
    assert!(model.resolve_all().is_empty());
}

#[test]
fn test_remove_conceptual_set_cascades_through_mapping() {
    let mut model = load_fixture("shop.edmx");
    let orders = model.find_entity_set(Layer::Conceptual, "Orders").unwrap();
    let import = model.find_function_import("GetRecentOrders").unwrap();
    let junction = model.find_association_set_mapping("OrderTags").unwrap();

    let log = model.remove(orders).unwrap();
    assert!(log.iter().all(Notification::is_removal));
    assert!(model.find_entity_set_mapping("Orders").is_none());
    assert!(model
        .find_association_set(Layer::Conceptual, "FK_Orders_Customers")
        .is_none());
    assert!(model.find_association_set(Layer::Conceptual, "OrderTags").is_none());
    assert!(model.is_removed(junction));

    // The import survives with an unresolved entity set.
    assert!(!model.is_removed(import));
    assert_eq!(model.function_import_entity_set(import), None);
}

#[test]
fn test_remove_storage_column_drops_its_mappings() {
    let mut model = sales_model(4);
    let amount = column(&model, "Orders", "Amount");
    let order = entity_type(&model, "Order");
    let property = model.find_property(order, "Amount").unwrap();
    assert_eq!(model.columns_for_property(property), vec![amount]);

    model.remove(amount).unwrap();
    assert!(model.columns_for_property(property).is_empty());
    assert!(!model.is_removed(property));
    assert!(model.resolve_all().is_empty());
}

#[test]
fn test_remove_entity_type_cascades_to_type_mapping() {
    let mut model = sales_model(4);
    let order = entity_type(&model, "Order");
    let etm = model.type_mappings_of(order)[0];

    model.remove(order).unwrap();
    assert!(model.is_removed(etm));
    assert!(model.find_entity_set(Layer::Conceptual, "Orders").is_none());
    assert!(model.find_entity_set_mapping("Orders").is_none());
    assert!(model.resolve_all().is_empty());
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_fixture_function_import() {
    let model = load_fixture("shop.edmx");
    let function = model.find_function("GetRecentOrders").unwrap();
    let import = model.find_function_import("GetRecentOrders").unwrap();
    let mapping = model.find_function_import_mapping("GetRecentOrders").unwrap();
    assert_eq!(model.mapped_function(mapping), Some(function));
    assert_eq!(model.mapped_function_import(mapping), Some(import));
    assert!(!model.is_composable(function));

    let store = model.find_parameter(function, "Since").unwrap();
    let conceptual = model.find_parameter(import, "since").unwrap();
    assert_eq!(model.parameter_mode(store), Some(ParameterMode::In));
    assert!(model
        .parameter_type_descriptor(store)
        .is_equivalent(&model.parameter_type_descriptor(conceptual)));
}

#[test]
fn test_add_function_import_with_parameters() {
    let mut model = sales_model(4);
    let function = model
        .add_function(&FunctionSpec::procedure("FindOrders"))
        .unwrap();
    model
        .add_parameter(function, "Code", "char", ParameterMode::In)
        .unwrap();
    let orders = model.find_entity_set(Layer::Conceptual, "Orders").unwrap();
    let import = model
        .add_function_import("FindOrders", Some("Collection(Sales.Order)"), Some(orders))
        .unwrap();
    model
        .add_parameter(import, "Code", "String", ParameterMode::In)
        .unwrap();
    let mapping = model.add_function_import_mapping(import, function).unwrap();

    assert_eq!(model.mapped_function(mapping), Some(function));
    assert_eq!(model.function_import_entity_set(import), Some(orders));
    assert_eq!(model.attribute(mapping, "FunctionName"), Some("Sales.Store.FindOrders"));
    assert_eq!(model.parameters(import).len(), 1);

    let err = model
        .add_parameter(import, "Code", "Int32", ParameterMode::Out)
        .unwrap_err();
    assert!(matches!(err, EdmxError::DuplicateMember { .. }));
    assert!(model.resolve_all().is_empty());
}

#[test]
fn test_rename_function_updates_import_mapping() {
    let mut model = load_fixture("shop.edmx");
    let function = model.find_function("GetRecentOrders").unwrap();
    model.rename(function, "GetLatestOrders").unwrap();

    let mapping = model.find_function_import_mapping("GetRecentOrders").unwrap();
    assert_eq!(
        model.attribute(mapping, "FunctionName"),
        Some("ShopModel.Store.GetLatestOrders")
    );
    assert_eq!(model.mapped_function(mapping), Some(function));
}

// ============================================================================
// Shared properties
// ============================================================================

#[test]
fn test_common_properties() {
    let model = load_fixture("shop.edmx");
    let common = model.common_properties(Layer::Conceptual);
    assert_eq!(common.len(), 1);
    assert_eq!(common[0].name, "Id");
    let owners: Vec<String> = common[0].owners.iter().map(|&t| model.name(t)).collect();
    assert_eq!(owners, vec!["Customer", "Order", "Region", "Tag"]);
    assert_eq!(common[0].properties.len(), common[0].owners.len());
}

#[test]
fn test_common_properties_require_same_description() {
    let model = sales_model(2);
    let common = model.common_properties(Layer::Storage);
    let names: Vec<&str> = common.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Id"]);
}

// ============================================================================
// Association set mappings
// ============================================================================

#[test]
fn test_association_set_mapping_maps_end_columns() {
    let mut model = sales_model(4);
    let customer = entity_type(&model, "Customer");
    let order = entity_type(&model, "Order");
    let association = model
        .add_association(
            Layer::Conceptual,
            &AssociationSpec {
                name: "CustomerOrders".to_string(),
                ends: [
                    EndSpec::new("Customer", customer, Multiplicity::One),
                    EndSpec::new("Order", order, Multiplicity::Many),
                ],
                constraint: None,
            },
        )
        .unwrap();
    let customers = model.find_entity_set(Layer::Conceptual, "Customers").unwrap();
    let orders = model.find_entity_set(Layer::Conceptual, "Orders").unwrap();
    let set = model
        .add_association_set(
            "CustomerOrders",
            association,
            &[("Customer", customers), ("Order", orders)],
        )
        .unwrap();
    let store = store_set(&model, "Orders");
    let mapping = model.add_association_set_mapping(set, store).unwrap();

    let customer_id = model.find_property(customer, "Id").unwrap();
    let order_id = model.find_property(order, "Id").unwrap();
    let customer_column = column(&model, "Orders", "CustomerId");
    let scalar = model
        .add_end_scalar_mapping(mapping, "Customer", customer_id, customer_column)
        .unwrap();
    model
        .add_end_scalar_mapping(mapping, "Order", order_id, column(&model, "Orders", "Id"))
        .unwrap();

    assert_eq!(model.scalar_mapping_end_role(scalar), Some("Customer"));
    assert_eq!(model.mapped_association(mapping), Some(association));
    assert!(model
        .members_for_column(customer_column)
        .contains(&ColumnMember::Association(association)));

    let err = model
        .add_end_scalar_mapping(mapping, "Nobody", customer_id, customer_column)
        .unwrap_err();
    assert!(matches!(err, EdmxError::InvalidReference { .. }));
    assert!(model.resolve_all().is_empty());
}

#[test]
fn test_scalar_mapping_rejects_column_of_other_table() {
    let mut model = sales_schema(4);
    let customer = entity_type(&model, "Customer");
    let etm = model.type_mappings_of(customer)[0];
    let fragment = model.mapping_fragments(etm)[0];
    let name = model.find_property(customer, "Name").unwrap();
    let amount = column(&model, "Orders", "Amount");

    let err = model.add_scalar_mapping(fragment, name, amount).unwrap_err();
    assert!(matches!(err, EdmxError::InvalidReference { .. }));
}
