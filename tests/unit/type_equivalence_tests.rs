//! Unit tests for native type normalization and descriptor equivalence

use pretty_assertions::assert_eq;
use rust_edmx::types::{
    from_native_descriptor, BaseType, DeclaredFacets, LengthFacet, ScalarTypeDescriptor,
    UnicodeFacet,
};

const NATIVE_TABLE: &[(&str, BaseType, bool)] = &[
    ("bigint", BaseType::Int64, false),
    ("binary", BaseType::Binary, false),
    ("image", BaseType::Binary, false),
    ("varbinary", BaseType::Binary, false),
    ("timestamp", BaseType::Binary, false),
    ("rowversion", BaseType::Binary, false),
    ("bit", BaseType::Boolean, false),
    ("char", BaseType::String, false),
    ("varchar", BaseType::String, false),
    ("text", BaseType::String, false),
    ("nchar", BaseType::String, true),
    ("nvarchar", BaseType::String, true),
    ("ntext", BaseType::String, true),
    ("xml", BaseType::String, true),
    ("date", BaseType::DateTime, false),
    ("datetime", BaseType::DateTime, false),
    ("datetime2", BaseType::DateTime, false),
    ("smalldatetime", BaseType::DateTime, false),
    ("time", BaseType::Time, false),
    ("datetimeoffset", BaseType::DateTimeOffset, false),
    ("decimal", BaseType::Decimal, false),
    ("numeric", BaseType::Decimal, false),
    ("money", BaseType::Decimal, false),
    ("smallmoney", BaseType::Decimal, false),
    ("float", BaseType::Double, false),
    ("real", BaseType::Single, false),
    ("int", BaseType::Int32, false),
    ("smallint", BaseType::Int16, false),
    ("tinyint", BaseType::Byte, false),
    ("uniqueidentifier", BaseType::Guid, false),
    ("geography", BaseType::Geography, false),
    ("geometry", BaseType::Geometry, false),
];

fn no_facets() -> DeclaredFacets {
    DeclaredFacets::default()
}

fn descriptor(type_name: &str, max_length: LengthFacet, unicode: UnicodeFacet) -> ScalarTypeDescriptor {
    ScalarTypeDescriptor {
        type_name: type_name.to_string(),
        nullable: true,
        fixed_length: false,
        unicode,
        max_length,
        precision: None,
        scale: None,
    }
}

// ============================================================================
// Native type table
// ============================================================================

#[test]
fn test_every_native_type_maps_case_insensitively() {
    for &(native, base_type, unicode) in NATIVE_TABLE {
        for spelling in [native.to_string(), native.to_uppercase()] {
            let mapping = from_native_descriptor(&spelling)
                .unwrap_or_else(|| panic!("{spelling} should map"));
            assert_eq!(mapping.base_type, base_type, "{spelling}");
            assert_eq!(mapping.unicode, unicode, "{spelling}");
        }
    }
}

#[test]
fn test_max_facet_is_ignored_for_mapping() {
    for spelling in ["NVARCHAR(MAX)", "nvarchar(max)", "nvarchar(50)"] {
        let mapping = from_native_descriptor(spelling).unwrap();
        assert_eq!(mapping.base_type, BaseType::String);
        assert!(mapping.unicode);
    }
}

#[test]
fn test_unknown_native_type_has_no_mapping() {
    assert!(from_native_descriptor("sql_variant").is_none());
    let column = ScalarTypeDescriptor::for_store_column("hierarchyid", &no_facets());
    assert_eq!(column.type_name, "hierarchyid");
}

// ============================================================================
// Equivalence
// ============================================================================

#[test]
fn test_equivalence_is_symmetric() {
    let samples = [
        descriptor("String", LengthFacet::Unspecified, UnicodeFacet::Compare(true)),
        descriptor("String", LengthFacet::Value(50), UnicodeFacet::Compare(false)),
        descriptor("String", LengthFacet::Max, UnicodeFacet::Ignored),
        descriptor("string", LengthFacet::Value(20), UnicodeFacet::Compare(true)),
        descriptor("Int32", LengthFacet::Unspecified, UnicodeFacet::Compare(false)),
    ];
    for a in &samples {
        for b in &samples {
            assert_eq!(a.is_equivalent(b), b.is_equivalent(a), "{a:?} vs {b:?}");
        }
    }
}

#[test]
fn test_unspecified_length_matches_any_length() {
    let open = descriptor("String", LengthFacet::Unspecified, UnicodeFacet::Compare(true));
    let fixed = descriptor("String", LengthFacet::Value(50), UnicodeFacet::Compare(true));
    let max = descriptor("String", LengthFacet::Max, UnicodeFacet::Compare(true));
    assert!(open.is_equivalent(&fixed));
    assert!(open.is_equivalent(&max));
    assert!(!fixed.is_equivalent(&max));
}

#[test]
fn test_zero_max_length_is_unspecified() {
    assert_eq!(LengthFacet::parse("0"), LengthFacet::Unspecified);
    let zero = ScalarTypeDescriptor::for_model_property(
        "String",
        &DeclaredFacets {
            max_length: Some("0".to_string()),
            ..no_facets()
        },
    );
    let fifty = ScalarTypeDescriptor::for_model_property(
        "String",
        &DeclaredFacets {
            max_length: Some("50".to_string()),
            ..no_facets()
        },
    );
    assert!(zero.is_equivalent(&fifty));
}

#[test]
fn test_unicode_differs_only_when_both_sides_compare() {
    let on = descriptor("String", LengthFacet::Unspecified, UnicodeFacet::Compare(true));
    let off = descriptor("String", LengthFacet::Unspecified, UnicodeFacet::Compare(false));
    let ignored = descriptor("String", LengthFacet::Unspecified, UnicodeFacet::Ignored);
    assert!(!on.is_equivalent(&off));
    assert!(on.is_equivalent(&ignored));
    assert!(off.is_equivalent(&ignored));
}

#[test]
fn test_store_column_and_model_property_agree() {
    let column = ScalarTypeDescriptor::for_store_column(
        "nvarchar",
        &DeclaredFacets {
            max_length: Some("100".to_string()),
            nullable: Some(false),
            ..no_facets()
        },
    );
    let property = ScalarTypeDescriptor::for_model_property(
        "Edm.String",
        &DeclaredFacets {
            max_length: Some("100".to_string()),
            nullable: Some(false),
            fixed_length: Some(false),
            unicode: Some(true),
            ..no_facets()
        },
    );
    assert!(column.is_equivalent(&property));
}

#[test]
fn test_money_against_decimal_scale() {
    let column = ScalarTypeDescriptor::for_store_column("money", &no_facets());
    let matching = ScalarTypeDescriptor::for_model_property(
        "Decimal",
        &DeclaredFacets {
            precision: Some(19),
            scale: Some(4),
            ..no_facets()
        },
    );
    let mismatched = ScalarTypeDescriptor::for_model_property(
        "Decimal",
        &DeclaredFacets {
            precision: Some(19),
            scale: Some(2),
            ..no_facets()
        },
    );
    assert!(column.is_equivalent(&matching));
    assert!(!column.is_equivalent(&mismatched));
}

#[test]
fn test_function_parameters_relax_layout() {
    let parameter = ScalarTypeDescriptor::for_store_function_parameter("char(10)", &no_facets());
    assert!(parameter.nullable);
    assert!(!parameter.fixed_length);
    assert_eq!(parameter.unicode, UnicodeFacet::Ignored);

    let import = ScalarTypeDescriptor::for_model_function_parameter("String", &no_facets());
    assert!(parameter.is_equivalent(&import));
}
