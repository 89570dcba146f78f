//! rust-edmx: an editable object model over Entity Data Model documents
//!
//! This library loads `.edmx` files into a synchronized three-layer graph
//! (storage, conceptual, mapping), keeps cross-layer references consistent
//! through renames and removals, and reports where the storage and
//! conceptual layers have drifted apart.

pub mod document;
pub mod drift;
pub mod error;
pub mod model;
pub mod types;
mod util;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

pub use document::{EdmxDocument, EdmxVersion};
pub use drift::{detect_drift, DriftOptions, DriftReport, Exclusions};
pub use error::EdmxError;
pub use model::EdmxModel;
pub use types::{BaseType, ScalarTypeDescriptor};

/// Options for checking one document for drift
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Path to the .edmx file
    pub path: PathBuf,
    /// Which column attributes to compare
    pub drift: DriftOptions,
    /// Names to leave out of every query
    pub exclusions: Exclusions,
}

/// Load a document and run every drift query over it
pub fn check_file(options: &CheckOptions) -> Result<DriftReport> {
    let model = EdmxModel::load(&options.path)?;
    info!(
        path = %options.path.display(),
        version = ?model.version(),
        "loaded document"
    );

    let dangling = model.resolve_all();
    if !dangling.is_empty() {
        info!(count = dangling.len(), "document has dangling references");
    }

    Ok(detect_drift(&model, &options.drift, &options.exclusions))
}
