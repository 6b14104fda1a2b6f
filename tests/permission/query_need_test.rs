use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use prism::permission::{DimensionFilter, MissingDimensionPolicy, QueryNeed};

fn region(values: &[&str]) -> DimensionFilter {
    DimensionFilter::include("region", values.iter().copied())
}

fn facility(values: &[&str]) -> DimensionFilter {
    DimensionFilter::include("facility", values.iter().copied())
}

fn hash_of(need: &QueryNeed) -> u64 {
    let mut hasher = DefaultHasher::new();
    need.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_all_values_contains_include() {
    let everything = QueryNeed::new([DimensionFilter::all("region")]);
    let kigali = QueryNeed::new([region(&["Kigali"])]);
    assert!(everything.contains(&kigali));
    assert!(!kigali.contains(&everything));
}

#[test]
fn test_missing_dimension_is_never_contained() {
    let granted = QueryNeed::new([DimensionFilter::all("region")]);
    let required = QueryNeed::new([region(&["Kigali"]), facility(&["F1"])]);
    assert!(!granted.contains(&required));
    assert!(required.contains(&QueryNeed::new([region(&["Kigali"])])));
}

#[test]
fn test_and_drops_one_sided_dimensions_by_default() {
    let left = QueryNeed::new([region(&["A", "B"]), facility(&["F1"])]);
    let right = QueryNeed::new([region(&["B", "C"])]);

    let both = left.and(&right);
    assert_eq!(both, QueryNeed::new([region(&["B"])]));
    assert_eq!(both, left.and_with(&right, MissingDimensionPolicy::Drop));
}

#[test]
fn test_and_unconstrained_keeps_one_sided_dimensions() {
    let left = QueryNeed::new([region(&["A", "B"]), facility(&["F1"])]);
    let right = QueryNeed::new([region(&["B", "C"])]);

    assert_eq!(
        left.and_with(&right, MissingDimensionPolicy::Unconstrained),
        QueryNeed::new([region(&["B"]), facility(&["F1"])])
    );
}

#[test]
fn test_and_deny_empties_one_sided_dimensions() {
    let left = QueryNeed::new([region(&["A", "B"]), facility(&["F1"])]);
    let right = QueryNeed::new([region(&["B", "C"])]);

    let both = left.and_with(&right, MissingDimensionPolicy::Deny);
    assert_eq!(
        both,
        QueryNeed::new([region(&["B"]), DimensionFilter::empty("facility")])
    );
    assert!(!both.get("facility").unwrap().is_active());
}

#[test]
fn test_or_keeps_shared_dimensions_only() {
    let left = QueryNeed::new([region(&["A"]), facility(&["F1"])]);
    let right = QueryNeed::new([region(&["B"])]);
    assert_eq!(left.or(&right), QueryNeed::new([region(&["A", "B"])]));
}

#[test]
fn test_not_negates_each_dimension() {
    let need = QueryNeed::new([region(&["A"]), DimensionFilter::all("facility")]);
    let negated = !&need;
    assert_eq!(
        negated,
        QueryNeed::new([
            DimensionFilter::all_except("region", ["A"]),
            DimensionFilter::empty("facility"),
        ])
    );
    assert_eq!(!negated, need);
}

#[test]
fn test_operators_on_equal_needs() {
    let need = QueryNeed::new([region(&["A"])]);
    assert_eq!(need.and(&need), need);
    assert_eq!(need.or(&need), need);
    assert!(need.contains(&need));
}

#[test]
fn test_usable_as_set_key() {
    let a = QueryNeed::new([region(&["A", "B"]), facility(&["F1"])]);
    let b = QueryNeed::new([facility(&["F1"]), region(&["B"]), region(&["A"])]);
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    let set: HashSet<QueryNeed> = [a, b, QueryNeed::new([region(&["C"])])].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_fingerprint_tracks_content() {
    let a = QueryNeed::new([region(&["A"])]);
    let b = QueryNeed::new([region(&["B"])]);
    assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    assert_eq!(a.fingerprint().unwrap(), a.clone().fingerprint().unwrap());
}

#[test]
fn test_empty_need() {
    let empty = QueryNeed::default();
    assert!(empty.is_empty());
    assert!(QueryNeed::new([region(&["A"])]).contains(&empty));
    assert!(!empty.contains(&QueryNeed::new([region(&["A"])])));
}
