//! Drift query configuration and exclusion lists

use std::collections::HashSet;

use crate::util::fold_key;

/// When the store-generated pattern of a column is compared with its
/// conceptual properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreGeneratedPolicy {
    /// Skip the comparison when the conceptual entity type has a base type
    /// or subtypes. Polymorphic overrides often carry a different pattern
    /// for the same column; this is an approximation kept as-is.
    #[default]
    SkipInheritanceHierarchies,
    /// Always compare.
    CompareAll,
}

/// Which column attributes `changed_scalar_members` compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftOptions {
    pub compare_key_membership: bool,
    pub compare_member_type: bool,
    pub compare_store_generated_pattern: bool,
    pub compare_default_value: bool,
    pub compare_collation: bool,
    pub store_generated_policy: StoreGeneratedPolicy,
}

impl Default for DriftOptions {
    fn default() -> Self {
        Self {
            compare_key_membership: true,
            compare_member_type: true,
            compare_store_generated_pattern: true,
            compare_default_value: true,
            compare_collation: true,
            store_generated_policy: StoreGeneratedPolicy::default(),
        }
    }
}

/// Case-insensitive set of names to leave out of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(fold_key(name.trim()));
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.names.is_empty() && self.names.contains(&fold_key(name.trim()))
    }

    /// A member is excluded by its bare name or by `Set.Member`.
    pub fn contains_member(&self, set: &str, member: &str) -> bool {
        self.contains(member) || self.contains(&format!("{}.{}", set, member))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ExclusionSet::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

/// Every exclusion list the drift queries accept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    /// Storage entity set names
    pub sets: ExclusionSet,
    /// Storage entity type (table) names
    pub types: ExclusionSet,
    /// Column names, bare or `Set.Column`
    pub members: ExclusionSet,
    /// Storage association names
    pub associations: ExclusionSet,
}
