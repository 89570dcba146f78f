//! Properties shared by name across entity types

use super::handles::{EntityType, Property};
use super::{EdmxModel, Layer};
use crate::util::eq_ci;

/// A property name declared on several entity types with one type
/// description.
///
/// Equality compares the name and the declared type description only:
/// type name, nullability, raw max length, precision and scale. It is
/// deliberately narrower than type equivalence, so `MaxLength="50"` and an
/// absent max length are different entries.
#[derive(Debug, Clone)]
pub struct CommonProperty {
    pub name: String,
    pub type_name: String,
    pub nullable: Option<bool>,
    pub max_length: Option<String>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    /// Declaring entity types in document order
    pub owners: Vec<EntityType>,
    /// The declarations, parallel to `owners`
    pub properties: Vec<Property>,
}

impl PartialEq for CommonProperty {
    fn eq(&self, other: &Self) -> bool {
        eq_ci(&self.name, &other.name)
            && eq_ci(&self.type_name, &other.type_name)
            && self.nullable == other.nullable
            && self.max_length == other.max_length
            && self.precision == other.precision
            && self.scale == other.scale
    }
}

impl Eq for CommonProperty {}

impl EdmxModel {
    fn common_entry(&self, owner: EntityType, property: Property) -> CommonProperty {
        let facets = self.declared_facets(property);
        CommonProperty {
            name: self.key_of(property.0),
            type_name: self.property_type(property).unwrap_or_default().to_string(),
            nullable: facets.nullable,
            max_length: facets.max_length,
            precision: facets.precision,
            scale: facets.scale,
            owners: vec![owner],
            properties: vec![property],
        }
    }

    /// Property declarations that recur with the same name and type
    /// description on two or more entity types of `layer`.
    pub fn common_properties(&self, layer: Layer) -> Vec<CommonProperty> {
        let mut entries: Vec<CommonProperty> = Vec::new();
        for entity_type in self.entity_types(layer) {
            for property in self.properties(entity_type) {
                let candidate = self.common_entry(entity_type, property);
                match entries.iter_mut().find(|e| **e == candidate) {
                    Some(entry) => {
                        if !entry.owners.contains(&entity_type) {
                            entry.owners.push(entity_type);
                            entry.properties.push(property);
                        }
                    }
                    None => entries.push(candidate),
                }
            }
        }
        entries.retain(|e| e.owners.len() > 1);
        entries
    }
}
