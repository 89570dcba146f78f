//! Unit tests for drift configuration and report types

use rust_edmx::drift::{
    AssociationChange, DriftOptions, DriftReport, ExclusionSet, Exclusions, MemberDifference,
    StoreGeneratedPolicy,
};

#[test]
fn test_exclusion_set_ignores_order_and_case() {
    let a: ExclusionSet = ["Orders", "Customers"].into_iter().collect();
    let b: ExclusionSet = ["customers", "ORDERS"].into_iter().collect();
    assert_eq!(a, b);
    assert!(a.contains(" orders "));
}

#[test]
fn test_exclusion_set_from_owned_strings() {
    let names = vec!["Audit".to_string(), "Legacy".to_string()];
    let set: ExclusionSet = names.iter().collect();
    assert_eq!(set.len(), 2);
    assert!(set.contains_member("Anything", "legacy"));
}

#[test]
fn test_default_exclusions_are_empty() {
    let exclusions = Exclusions::default();
    assert!(exclusions.sets.is_empty());
    assert!(exclusions.types.is_empty());
    assert!(exclusions.members.is_empty());
    assert!(exclusions.associations.is_empty());
}

#[test]
fn test_options_can_disable_single_comparison() {
    let options = DriftOptions {
        compare_member_type: false,
        store_generated_policy: StoreGeneratedPolicy::CompareAll,
        ..DriftOptions::default()
    };
    assert!(!options.compare_member_type);
    assert!(options.compare_collation);
}

#[test]
fn test_empty_report_has_no_drift() {
    assert!(!DriftReport::default().has_drift());
}

#[test]
fn test_difference_display() {
    assert_eq!(MemberDifference::StoreGeneratedPattern.to_string(), "store generated pattern");
    assert_eq!(
        AssociationChange::KeyCountDiffers {
            storage: 2,
            conceptual: 1
        }
        .to_string(),
        "2 storage key pairs vs 1 conceptual"
    );
}
