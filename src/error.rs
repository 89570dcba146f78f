//! Error types for rust-edmx

use std::path::PathBuf;
use thiserror::Error;

use crate::model::ObjectKind;

/// Errors raised while loading, editing, or saving an EDMX document.
///
/// Structural errors carry the kind and fully-qualified name of the object
/// the failing operation was invoked on.
#[derive(Error, Debug)]
pub enum EdmxError {
    #[error("Failed to read document: {path}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write document: {path}")]
    DocumentWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse document")]
    DocumentParse(#[from] roxmltree::Error),

    #[error("XML write error: {message}")]
    XmlWrite { message: String },

    #[error("Unknown EDMX dialect: root namespace '{namespace}'")]
    UnknownDialect { namespace: String },

    #[error("Document is missing the {region} region")]
    MissingRegion { region: &'static str },

    #[error("Invalid reference from {owner_kind} '{owner}': {message}")]
    InvalidReference {
        owner_kind: ObjectKind,
        owner: String,
        message: String,
    },

    #[error("{owner_kind} '{owner}' already has a {member_kind} named '{name}'")]
    DuplicateMember {
        owner_kind: ObjectKind,
        owner: String,
        member_kind: ObjectKind,
        name: String,
    },

    #[error("Missing required argument '{argument}' for {owner_kind} '{owner}'")]
    MissingArgument {
        owner_kind: ObjectKind,
        owner: String,
        argument: &'static str,
    },

    #[error("Cannot modify {owner_kind} '{owner}': {message}")]
    InvalidMutation {
        owner_kind: ObjectKind,
        owner: String,
        message: String,
    },

    #[error("{kind} '{name}' has been removed from the model")]
    ObjectRemoved { kind: ObjectKind, name: String },
}

pub type Result<T, E = EdmxError> = std::result::Result<T, E>;
