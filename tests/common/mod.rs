//! Common test utilities for rust-edmx tests

use std::path::{Path, PathBuf};

use rust_edmx::model::{
    AssociationSpec, EndSpec, EntitySet, EntityType, Layer, Multiplicity, Property, PropertySpec,
    ReferentialConstraint,
};
use rust_edmx::{EdmxModel, EdmxVersion};
use tempfile::TempDir;

/// Path to a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load a fixture document
pub fn load_fixture(name: &str) -> EdmxModel {
    EdmxModel::load(fixture_path(name)).expect("Failed to load fixture")
}

/// Test context with temporary directory for isolated save/load round trips
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub dir: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            dir,
        }
    }

    /// Copy a fixture into the temp directory and return its path
    pub fn with_fixture(name: &str) -> (Self, PathBuf) {
        let ctx = Self::new();
        let path = ctx.dir.join(name);
        std::fs::copy(fixture_path(name), &path).expect("Failed to copy fixture");
        (ctx, path)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Save `model` and load it back
    pub fn round_trip(&self, model: &EdmxModel, name: &str) -> EdmxModel {
        let path = self.path(name);
        model.save(&path).expect("Failed to save model");
        reload(&path)
    }
}

pub fn reload(path: &Path) -> EdmxModel {
    EdmxModel::load(path).expect("Failed to reload model")
}

pub fn storage_table(model: &EdmxModel, name: &str) -> EntityType {
    model
        .find_entity_type(Layer::Storage, name)
        .unwrap_or_else(|| panic!("no storage table {name}"))
}

pub fn entity_type(model: &EdmxModel, name: &str) -> EntityType {
    model
        .find_entity_type(Layer::Conceptual, name)
        .unwrap_or_else(|| panic!("no entity type {name}"))
}

pub fn column(model: &EdmxModel, table: &str, name: &str) -> Property {
    let table = storage_table(model, table);
    model
        .find_property(table, name)
        .unwrap_or_else(|| panic!("no column {name}"))
}

pub fn store_set(model: &EdmxModel, name: &str) -> EntitySet {
    model
        .find_entity_set(Layer::Storage, name)
        .unwrap_or_else(|| panic!("no storage set {name}"))
}

fn add_key(model: &mut EdmxModel, owner: EntityType, spec: PropertySpec) -> Property {
    let property = model.add_property(owner, &spec).unwrap();
    model.set_key_member(property, true).unwrap();
    property
}

/// A two-table sales model. Customers is mapped; Orders exists in both
/// layers but is left unmapped. Pass the scale of the conceptual
/// `Order.Amount` property (the `money` column has scale 4).
pub fn sales_schema(amount_scale: u8) -> EdmxModel {
    let mut model = EdmxModel::empty(EdmxVersion::V3, "Sales").unwrap();

    let customers = model.add_entity_type(Layer::Storage, "Customers").unwrap();
    add_key(
        &mut model,
        customers,
        PropertySpec::new("Id", "int").nullable(false).store_generated("Identity"),
    );
    model
        .add_property(
            customers,
            &PropertySpec::new("Name", "nvarchar").max_length("100").nullable(false),
        )
        .unwrap();

    let orders = model.add_entity_type(Layer::Storage, "Orders").unwrap();
    add_key(
        &mut model,
        orders,
        PropertySpec::new("Id", "int").nullable(false).store_generated("Identity"),
    );
    model
        .add_property(orders, &PropertySpec::new("CustomerId", "int").nullable(false))
        .unwrap();
    model
        .add_property(orders, &PropertySpec::new("Amount", "money").nullable(false))
        .unwrap();

    model
        .add_association(
            Layer::Storage,
            &AssociationSpec {
                name: "FK_Orders_Customers".to_string(),
                ends: [
                    EndSpec::new("Customers", customers, Multiplicity::One),
                    EndSpec::new("Orders", orders, Multiplicity::Many),
                ],
                constraint: Some(ReferentialConstraint {
                    principal_role: "Customers".to_string(),
                    principal_properties: vec!["Id".to_string()],
                    dependent_role: "Orders".to_string(),
                    dependent_properties: vec!["CustomerId".to_string()],
                }),
            },
        )
        .unwrap();
    let customers_set = model.add_entity_set("Customers", customers).unwrap();
    model.add_entity_set("Orders", orders).unwrap();

    let customer = model.add_entity_type(Layer::Conceptual, "Customer").unwrap();
    add_key(
        &mut model,
        customer,
        PropertySpec::new("Id", "Int32").nullable(false).store_generated("Identity"),
    );
    model
        .add_property(
            customer,
            &PropertySpec::new("Name", "String")
                .max_length("100")
                .fixed_length(false)
                .unicode(true)
                .nullable(false),
        )
        .unwrap();

    let order = model.add_entity_type(Layer::Conceptual, "Order").unwrap();
    add_key(
        &mut model,
        order,
        PropertySpec::new("Id", "Int32").nullable(false).store_generated("Identity"),
    );
    model
        .add_property(order, &PropertySpec::new("CustomerId", "Int32").nullable(false))
        .unwrap();
    model
        .add_property(
            order,
            &PropertySpec::new("Amount", "Decimal")
                .precision(19, amount_scale)
                .nullable(false),
        )
        .unwrap();

    let conceptual_customers = model.add_entity_set("Customers", customer).unwrap();
    model.add_entity_set("Orders", order).unwrap();

    let esm = model.add_entity_set_mapping(conceptual_customers).unwrap();
    let etm = model.add_entity_type_mapping(esm, customer, true).unwrap();
    let fragment = model.add_mapping_fragment(etm, customers_set).unwrap();
    for name in ["Id", "Name"] {
        let property = model.find_property(customer, name).unwrap();
        let column = model.find_property(customers, name).unwrap();
        model.add_scalar_mapping(fragment, property, column).unwrap();
    }

    model
}

/// Map the conceptual Orders set onto the storage Orders set, column by
/// column.
pub fn map_orders(model: &mut EdmxModel) {
    let order = entity_type(model, "Order");
    let orders = storage_table(model, "Orders");
    let set = model.find_entity_set(Layer::Conceptual, "Orders").unwrap();
    let store = store_set(model, "Orders");

    let esm = model.add_entity_set_mapping(set).unwrap();
    let etm = model.add_entity_type_mapping(esm, order, false).unwrap();
    let fragment = model.add_mapping_fragment(etm, store).unwrap();
    for name in ["Id", "CustomerId", "Amount"] {
        let property = model.find_property(order, name).unwrap();
        let column = model.find_property(orders, name).unwrap();
        model.add_scalar_mapping(fragment, property, column).unwrap();
    }
}

/// The sales model with both sets mapped.
pub fn sales_model(amount_scale: u8) -> EdmxModel {
    let mut model = sales_schema(amount_scale);
    map_orders(&mut model);
    model
}
