//! Native SQL Server type names and their normalized model types

use std::sync::LazyLock;

use regex::Regex;

use super::BaseType;

/// `name`, `name(max)`, `name(10)`, `name(18, 2)`
static NATIVE_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z0-9_]+)\s*(?:\(\s*(max|\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*$").unwrap()
});

/// Static table: native name, normalized base type, unicode.
const NATIVE_TYPES: &[(&str, BaseType, bool)] = &[
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

/// Native types whose values always occupy their declared length.
const FIXED_LENGTH_TYPES: &[&str] = &["char", "nchar", "binary", "timestamp", "rowversion"];

/// Native types whose precision and scale are implied by the name.
const IMPLICIT_PRECISION: &[(&str, u8, u8)] = &[("money", 19, 4), ("smallmoney", 10, 4)];

/// Result of normalizing a native type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTypeMapping {
    pub base_type: BaseType,
    pub unicode: bool,
}

/// A native type name split into its name and parenthesised facets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTypeName {
    /// Lowercased bare name, e.g. `nvarchar`
    pub name: String,
    /// `(max)` was given
    pub is_max: bool,
    /// First numeric facet: length or precision
    pub first: Option<u32>,
    /// Second numeric facet: scale
    pub second: Option<u32>,
}

impl NativeTypeName {
    pub fn parse(native: &str) -> Option<Self> {
        let caps = NATIVE_TYPE_RE.captures(native)?;
        let name = caps.get(1)?.as_str().to_lowercase();
        let facet = caps.get(2).map(|m| m.as_str());
        let is_max = facet.is_some_and(|f| f.eq_ignore_ascii_case("max"));
        let first = facet.and_then(|f| f.parse().ok());
        let second = caps.get(3).and_then(|m| m.as_str().parse().ok());
        Some(Self {
            name,
            is_max,
            first,
            second,
        })
    }

    pub fn is_fixed_length(&self) -> bool {
        FIXED_LENGTH_TYPES.contains(&self.name.as_str())
    }

    /// Precision and scale implied by the type itself (`money` is 19,4).
    pub fn implicit_precision(&self) -> Option<(u8, u8)> {
        IMPLICIT_PRECISION
            .iter()
            .find(|(n, _, _)| *n == self.name)
            .map(|&(_, p, s)| (p, s))
    }
}

/// Map a native storage type name to its normalized base type.
///
/// Matching is case-insensitive and ignores parenthesised facets, so
/// `NVARCHAR(MAX)` and `nvarchar` both map to a unicode string. Names outside
/// the fixed table return `None`.
pub fn from_native_descriptor(native: &str) -> Option<NativeTypeMapping> {
    let parsed = NativeTypeName::parse(native)?;
    NATIVE_TYPES
        .iter()
        .find(|(name, _, _)| *name == parsed.name)
        .map(|&(_, base_type, unicode)| NativeTypeMapping { base_type, unicode })
}
