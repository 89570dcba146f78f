//! EDMX schema-version dialects
//!
//! The three dialects share one document shape and differ only in the
//! namespace URIs of the wrapper and of each layer.

/// Namespace of the `annotation:` attributes (e.g. `StoreGeneratedPattern` on
/// conceptual properties). Identical across dialects.
pub const ANNOTATION_NS: &str = "http://schemas.microsoft.com/ado/2009/02/edm/annotation";

/// Namespace of the `store:` attributes written by the store schema generator.
pub const STORE_GENERATOR_NS: &str =
    "http://schemas.microsoft.com/ado/2007/12/edm/EntityStoreSchemaGenerator";

/// EDMX schema version of a loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmxVersion {
    /// .NET 3.5 SP1
    V1,
    /// .NET 4.0
    V2,
    /// .NET 4.5 / EF5+
    V3,
}

impl Default for EdmxVersion {
    fn default() -> Self {
        EdmxVersion::V3
    }
}

impl std::str::FromStr for EdmxVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "1.0" | "v1" | "V1" => Ok(EdmxVersion::V1),
            "2" | "2.0" | "v2" | "V2" => Ok(EdmxVersion::V2),
            "3" | "3.0" | "v3" | "V3" => Ok(EdmxVersion::V3),
            _ => Err(format!("Unknown EDMX version: {}", s)),
        }
    }
}

impl EdmxVersion {
    pub const ALL: [EdmxVersion; 3] = [EdmxVersion::V1, EdmxVersion::V2, EdmxVersion::V3];

    /// Resolve the dialect from the namespace URI of the `Edmx` root element.
    pub fn from_root_namespace(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.edmx_namespace() == uri)
    }

    /// Value of the `Version` attribute on the root element.
    pub fn version_attribute(&self) -> &'static str {
        match self {
            EdmxVersion::V1 => "1.0",
            EdmxVersion::V2 => "2.0",
            EdmxVersion::V3 => "3.0",
        }
    }

    pub fn edmx_namespace(&self) -> &'static str {
        match self {
            EdmxVersion::V1 => "http://schemas.microsoft.com/ado/2007/06/edmx",
            EdmxVersion::V2 => "http://schemas.microsoft.com/ado/2008/10/edmx",
            EdmxVersion::V3 => "http://schemas.microsoft.com/ado/2009/11/edmx",
        }
    }

    /// CSDL namespace of the conceptual layer.
    pub fn conceptual_namespace(&self) -> &'static str {
        match self {
            EdmxVersion::V1 => "http://schemas.microsoft.com/ado/2006/04/edm",
            EdmxVersion::V2 => "http://schemas.microsoft.com/ado/2008/09/edm",
            EdmxVersion::V3 => "http://schemas.microsoft.com/ado/2009/11/edm",
        }
    }

    /// SSDL namespace of the storage layer.
    pub fn storage_namespace(&self) -> &'static str {
        match self {
            EdmxVersion::V1 => "http://schemas.microsoft.com/ado/2006/04/edm/ssdl",
            EdmxVersion::V2 => "http://schemas.microsoft.com/ado/2009/02/edm/ssdl",
            EdmxVersion::V3 => "http://schemas.microsoft.com/ado/2009/11/edm/ssdl",
        }
    }

    /// MSL namespace of the mapping layer.
    pub fn mapping_namespace(&self) -> &'static str {
        match self {
            EdmxVersion::V1 => "urn:schemas-microsoft-com:windows:storage:mapping:CS",
            EdmxVersion::V2 => "http://schemas.microsoft.com/ado/2008/09/mapping/cs",
            EdmxVersion::V3 => "http://schemas.microsoft.com/ado/2009/11/mapping/cs",
        }
    }
}
