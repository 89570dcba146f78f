//! The backing document: a mutable XML tree plus its resolved dialect
//!
//! Parsing and serialization are thin boundary helpers; the object model in
//! [`crate::model`] only ever talks to [`XmlTree`].

mod dialect;
mod loader;
mod tree;
mod writer;

pub use dialect::{EdmxVersion, ANNOTATION_NS, STORE_GENERATOR_NS};
pub use loader::{load_file, parse_document};
pub use tree::{NamespaceDecl, NodeId, NodeKind, QualifiedName, XmlAttribute, XmlTree};
pub use writer::{save_file, write_document};

use crate::error::{EdmxError, Result};

/// A parsed EDMX document.
#[derive(Debug, Clone)]
pub struct EdmxDocument {
    pub tree: XmlTree,
    pub version: EdmxVersion,
}

/// The region roots of the three layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    /// Conceptual `Schema` element
    pub conceptual_schema: NodeId,
    /// Storage `Schema` element
    pub storage_schema: NodeId,
    /// Mapping `EntityContainerMapping` element
    pub container_mapping: NodeId,
}

impl EdmxDocument {
    /// Locate the three layer roots.
    ///
    /// Entity containers are created on demand by the model, but the schema
    /// and mapping elements themselves must exist.
    pub fn regions(&self) -> Result<Regions> {
        let tree = &self.tree;
        let runtime = tree
            .first_child_element(tree.root(), "Runtime")
            .ok_or(EdmxError::MissingRegion { region: "Runtime" })?;

        let conceptual_schema = tree
            .first_child_element(runtime, "ConceptualModels")
            .and_then(|n| tree.first_child_element(n, "Schema"))
            .ok_or(EdmxError::MissingRegion {
                region: "ConceptualModels",
            })?;
        let storage_schema = tree
            .first_child_element(runtime, "StorageModels")
            .and_then(|n| tree.first_child_element(n, "Schema"))
            .ok_or(EdmxError::MissingRegion {
                region: "StorageModels",
            })?;
        let container_mapping = tree
            .first_child_element(runtime, "Mappings")
            .and_then(|n| tree.first_child_element(n, "Mapping"))
            .and_then(|n| tree.first_child_element(n, "EntityContainerMapping"))
            .ok_or(EdmxError::MissingRegion { region: "Mappings" })?;

        Ok(Regions {
            conceptual_schema,
            storage_schema,
            container_mapping,
        })
    }

    /// An empty three-layer document of the given dialect.
    pub fn empty(version: EdmxVersion, namespace: &str) -> Self {
        let edmx_ns = version.edmx_namespace();
        let edmx = |local: &str| QualifiedName::new(Some(edmx_ns), local).with_prefix(Some("edmx"));

        let mut tree = XmlTree::new(edmx("Edmx"));
        let root = tree.root();
        tree.set_attribute(root, "Version", version.version_attribute());
        tree.add_namespace_decl(root, Some("edmx"), edmx_ns);

        let runtime = tree.create_element(edmx("Runtime"));
        tree.append_child(root, runtime);

        let store_namespace = format!("{}.Store", namespace);
        let storage = tree.create_element(edmx("StorageModels"));
        tree.append_child(runtime, storage);
        let ssdl = version.storage_namespace();
        let schema = tree.append_element(
            storage,
            QualifiedName::new(Some(ssdl), "Schema"),
            &[
                ("Namespace", store_namespace.as_str()),
                ("Alias", "Self"),
                ("Provider", "System.Data.SqlClient"),
                ("ProviderManifestToken", "2008"),
            ],
        );
        tree.add_namespace_decl(schema, None, ssdl);
        let store_container = format!("{}StoreContainer", namespace.replace('.', ""));
        tree.append_element(
            schema,
            QualifiedName::new(Some(ssdl), "EntityContainer"),
            &[("Name", store_container.as_str())],
        );

        let conceptual = tree.create_element(edmx("ConceptualModels"));
        tree.append_child(runtime, conceptual);
        let csdl = version.conceptual_namespace();
        let schema = tree.append_element(
            conceptual,
            QualifiedName::new(Some(csdl), "Schema"),
            &[("Namespace", namespace), ("Alias", "Self")],
        );
        tree.add_namespace_decl(schema, None, csdl);
        tree.add_namespace_decl(schema, Some("annotation"), ANNOTATION_NS);
        let cdm_container = format!("{}Entities", namespace.replace('.', ""));
        tree.append_element(
            schema,
            QualifiedName::new(Some(csdl), "EntityContainer"),
            &[("Name", cdm_container.as_str())],
        );

        let mappings = tree.create_element(edmx("Mappings"));
        tree.append_child(runtime, mappings);
        let msl = version.mapping_namespace();
        let mapping = tree.append_element(
            mappings,
            QualifiedName::new(Some(msl), "Mapping"),
            &[("Space", "C-S")],
        );
        tree.add_namespace_decl(mapping, None, msl);
        tree.append_element(
            mapping,
            QualifiedName::new(Some(msl), "EntityContainerMapping"),
            &[
                ("StorageEntityContainer", store_container.as_str()),
                ("CdmEntityContainer", cdm_container.as_str()),
            ],
        );

        Self { tree, version }
    }
}
