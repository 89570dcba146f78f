//! Type equivalence between storage-native and model types
//!
//! Both sides are normalized into a [`ScalarTypeDescriptor`]; drift detection
//! compares descriptors with [`ScalarTypeDescriptor::is_equivalent`].

mod native;

use std::fmt;

pub use native::{from_native_descriptor, NativeTypeMapping, NativeTypeName};

use crate::util::{eq_ci, starts_with_ci};

/// Normalized base type shared by both layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Int64,
    Binary,
    Boolean,
    String,
    DateTime,
    Time,
    DateTimeOffset,
    Decimal,
    Double,
    Single,
    Int32,
    Int16,
    Byte,
    Guid,
    Geography,
    Geometry,
}

impl BaseType {
    const ALL: [BaseType; 16] = [
        BaseType::Int64,
        BaseType::Binary,
        BaseType::Boolean,
        BaseType::String,
        BaseType::DateTime,
        BaseType::Time,
        BaseType::DateTimeOffset,
        BaseType::Decimal,
        BaseType::Double,
        BaseType::Single,
        BaseType::Int32,
        BaseType::Int16,
        BaseType::Byte,
        BaseType::Guid,
        BaseType::Geography,
        BaseType::Geometry,
    ];

    /// Conceptual-model type name.
    pub fn model_name(&self) -> &'static str {
        match self {
            BaseType::Int64 => "Int64",
            BaseType::Binary => "Binary",
            BaseType::Boolean => "Boolean",
            BaseType::String => "String",
            BaseType::DateTime => "DateTime",
            BaseType::Time => "Time",
            BaseType::DateTimeOffset => "DateTimeOffset",
            BaseType::Decimal => "Decimal",
            BaseType::Double => "Double",
            BaseType::Single => "Single",
            BaseType::Int32 => "Int32",
            BaseType::Int16 => "Int16",
            BaseType::Byte => "Byte",
            BaseType::Guid => "Guid",
            BaseType::Geography => "Geography",
            BaseType::Geometry => "Geometry",
        }
    }

    /// Parse a conceptual type name, with or without the `Edm.` prefix.
    pub fn from_model_name(name: &str) -> Option<Self> {
        let bare = strip_edm_prefix(name);
        Self::ALL.into_iter().find(|t| eq_ci(t.model_name(), bare))
    }

    /// Types whose first parenthesised facet is a length.
    fn has_length(&self) -> bool {
        matches!(self, BaseType::String | BaseType::Binary)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

fn strip_edm_prefix(name: &str) -> &str {
    if starts_with_ci(name, "Edm.") {
        &name[4..]
    } else {
        name
    }
}

/// Maximum length facet. `Unspecified` matches any length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthFacet {
    #[default]
    Unspecified,
    Max,
    Value(u32),
}

impl LengthFacet {
    /// Parse a `MaxLength` attribute value. `0` counts as unspecified.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("max") {
            return LengthFacet::Max;
        }
        match value.trim().parse::<u32>() {
            Ok(0) | Err(_) => LengthFacet::Unspecified,
            Ok(n) => LengthFacet::Value(n),
        }
    }

    fn matches(&self, other: &LengthFacet) -> bool {
        match (self, other) {
            (LengthFacet::Unspecified, _) | (_, LengthFacet::Unspecified) => true,
            (a, b) => a == b,
        }
    }
}

/// Unicode facet. `Ignored` opts the side out of unicode comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnicodeFacet {
    Ignored,
    Compare(bool),
}

impl UnicodeFacet {
    fn matches(&self, other: &UnicodeFacet) -> bool {
        match (self, other) {
            (UnicodeFacet::Compare(a), UnicodeFacet::Compare(b)) => a == b,
            _ => true,
        }
    }
}

/// Facets as declared on a property or parameter element. `None` means the
/// attribute was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredFacets {
    pub nullable: Option<bool>,
    pub max_length: Option<String>,
    pub fixed_length: Option<bool>,
    pub unicode: Option<bool>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

/// Normalized, comparable description of a scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarTypeDescriptor {
    /// Normalized base type name (model spelling when the type is known)
    pub type_name: String,
    pub nullable: bool,
    pub fixed_length: bool,
    pub unicode: UnicodeFacet,
    pub max_length: LengthFacet,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl ScalarTypeDescriptor {
    /// Descriptor of a storage column declared with a native type name.
    pub fn for_store_column(native_type: &str, facets: &DeclaredFacets) -> Self {
        let parsed = NativeTypeName::parse(native_type);
        let mapping = from_native_descriptor(native_type);

        let type_name = match (&mapping, &parsed) {
            (Some(m), _) => m.base_type.model_name().to_string(),
            (None, Some(p)) => p.name.clone(),
            (None, None) => native_type.trim().to_string(),
        };

        let has_length = mapping.is_some_and(|m| m.base_type.has_length());
        let max_length = match (&facets.max_length, &parsed) {
            (Some(declared), _) => LengthFacet::parse(declared),
            (None, Some(p)) if p.is_max => LengthFacet::Max,
            (None, Some(p)) if has_length => p.first.map_or(LengthFacet::Unspecified, |n| {
                LengthFacet::parse(&n.to_string())
            }),
            _ => LengthFacet::Unspecified,
        };

        let inline_precision = parsed.as_ref().filter(|_| !has_length).and_then(|p| {
            p.first
                .and_then(|n| u8::try_from(n).ok())
                .map(|prec| (prec, p.second.and_then(|s| u8::try_from(s).ok())))
        });
        let implicit = parsed.as_ref().and_then(NativeTypeName::implicit_precision);
        let precision = facets
            .precision
            .or(inline_precision.map(|(p, _)| p))
            .or(implicit.map(|(p, _)| p));
        let scale = facets
            .scale
            .or(inline_precision.and_then(|(_, s)| s))
            .or(implicit.map(|(_, s)| s));

        Self {
            type_name,
            nullable: facets.nullable.unwrap_or(true),
            fixed_length: facets
                .fixed_length
                .unwrap_or_else(|| parsed.as_ref().is_some_and(NativeTypeName::is_fixed_length)),
            unicode: UnicodeFacet::Compare(mapping.is_some_and(|m| m.unicode)),
            max_length,
            precision,
            scale,
        }
    }

    /// Descriptor of a storage function parameter. Nullability, layout and
    /// unicode are not declared for parameters, so they never cause a
    /// mismatch.
    pub fn for_store_function_parameter(native_type: &str, facets: &DeclaredFacets) -> Self {
        Self {
            nullable: true,
            fixed_length: false,
            unicode: UnicodeFacet::Ignored,
            ..Self::for_store_column(native_type, facets)
        }
    }

    /// Descriptor of a conceptual scalar property.
    pub fn for_model_property(type_name: &str, facets: &DeclaredFacets) -> Self {
        let base = BaseType::from_model_name(type_name);
        let type_name = match base {
            Some(b) => b.model_name().to_string(),
            None => strip_edm_prefix(type_name).to_string(),
        };
        let unicode = facets
            .unicode
            .unwrap_or(matches!(base, Some(BaseType::String)));

        Self {
            type_name,
            nullable: facets.nullable.unwrap_or(true),
            fixed_length: facets.fixed_length.unwrap_or(false),
            unicode: UnicodeFacet::Compare(unicode),
            max_length: facets
                .max_length
                .as_deref()
                .map_or(LengthFacet::Unspecified, LengthFacet::parse),
            precision: facets.precision,
            scale: facets.scale,
        }
    }

    /// Descriptor of a function-import parameter, relaxed like store
    /// function parameters.
    pub fn for_model_function_parameter(type_name: &str, facets: &DeclaredFacets) -> Self {
        Self {
            nullable: true,
            fixed_length: false,
            unicode: UnicodeFacet::Ignored,
            ..Self::for_model_property(type_name, facets)
        }
    }

    /// Equivalence with wildcard rules: an unspecified length or an ignored
    /// unicode facet on either side matches anything.
    pub fn is_equivalent(&self, other: &ScalarTypeDescriptor) -> bool {
        eq_ci(&self.type_name, &other.type_name)
            && self.nullable == other.nullable
            && self.fixed_length == other.fixed_length
            && self.max_length.matches(&other.max_length)
            && self.precision == other.precision
            && self.scale == other.scale
            && self.unicode.matches(&other.unicode)
    }
}
