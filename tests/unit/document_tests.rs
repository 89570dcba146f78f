//! Unit tests for loading and writing the backing document

use pretty_assertions::assert_eq;
use rust_edmx::document::{parse_document, write_document, EdmxDocument};
use rust_edmx::model::Layer;
use rust_edmx::{EdmxError, EdmxModel, EdmxVersion};

#[test]
fn test_dialect_is_resolved_from_root_namespace() {
    for version in EdmxVersion::ALL {
        let empty = EdmxDocument::empty(version, "Test");
        let text = write_document(&empty.tree).unwrap();
        let parsed = parse_document(&text).unwrap();
        assert_eq!(parsed.version, version);
    }
}

#[test]
fn test_unknown_root_namespace_is_rejected() {
    let text = r#"<?xml version="1.0"?><Edmx xmlns="urn:not-edmx"><Runtime /></Edmx>"#;
    let err = parse_document(text).unwrap_err();
    assert!(matches!(err, EdmxError::UnknownDialect { .. }));
}

#[test]
fn test_malformed_xml_is_a_parse_error() {
    let err = parse_document("<edmx:Edmx").unwrap_err();
    assert!(matches!(err, EdmxError::DocumentParse(_)));
}

#[test]
fn test_missing_region_is_reported() {
    let text = r#"<?xml version="1.0"?>
<edmx:Edmx Version="3.0" xmlns:edmx="http://schemas.microsoft.com/ado/2009/11/edmx">
  <edmx:Runtime>
    <edmx:ConceptualModels>
      <Schema Namespace="M" xmlns="http://schemas.microsoft.com/ado/2009/11/edm" />
    </edmx:ConceptualModels>
  </edmx:Runtime>
</edmx:Edmx>"#;
    let err = EdmxModel::parse(text).unwrap_err();
    assert!(matches!(err, EdmxError::MissingRegion { .. }));
}

#[test]
fn test_empty_model_has_linked_containers() {
    let model = EdmxModel::empty(EdmxVersion::V2, "Inventory.Data").unwrap();
    assert_eq!(model.version(), EdmxVersion::V2);
    assert_eq!(
        model.container_name(Layer::Conceptual).as_deref(),
        Some("InventoryDataEntities")
    );
    assert_eq!(
        model.container_name(Layer::Storage).as_deref(),
        Some("InventoryDataStoreContainer")
    );
    assert!(model.entity_types(Layer::Conceptual).is_empty());
    assert!(model.resolve_all().is_empty());
}

#[test]
fn test_written_document_keeps_prefixes() {
    let model = EdmxModel::empty(EdmxVersion::V3, "Shop").unwrap();
    let text = model.to_xml_string().unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<edmx:Edmx"));
    assert!(text.contains("<edmx:StorageModels>"));
    assert!(text.contains(r#"Namespace="Shop.Store""#));
}
