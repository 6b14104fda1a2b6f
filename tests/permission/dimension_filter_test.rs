use prism::permission::{DimensionFilter, PermissionError, ValueMode};
use serde_json::json;

fn no_values() -> Vec<&'static str> {
    Vec::new()
}

#[test]
fn test_include_and_all_are_mutually_exclusive() {
    let err = DimensionFilter::new("region", ["a"], no_values(), true).unwrap_err();
    assert_eq!(
        err,
        PermissionError::ConflictingModes {
            dimension: "region".to_string(),
            fields: vec!["all_values", "include_values"],
        }
    );
    assert!(DimensionFilter::new("region", ["a"], ["b"], false).is_err());
}

#[test]
fn test_exclude_only_means_everything_except() {
    let filter = DimensionFilter::new("region", no_values(), ["A"], false).unwrap();
    assert_eq!(filter.mode(), ValueMode::All);
    assert_eq!(filter, DimensionFilter::all_except("region", ["A"]));
}

#[test]
fn test_and_of_include_sets_intersects() {
    let left = DimensionFilter::include("region", ["A", "B"]);
    let right = DimensionFilter::include("region", ["B", "C"]);
    assert_eq!(
        left.and(&right).unwrap(),
        DimensionFilter::include("region", ["B"])
    );
}

#[test]
fn test_and_of_all_filters_intersects_excludes() {
    let left = DimensionFilter::new("region", no_values(), ["A"], true).unwrap();
    let right = DimensionFilter::new("region", no_values(), ["B"], true).unwrap();
    let both = left.and(&right).unwrap();
    assert!(both.all_values());
    assert!(both.exclude_values().is_empty());
}

#[test]
fn test_and_with_all_keeps_the_include_side() {
    let all = DimensionFilter::all_except("region", ["A"]);
    let include = DimensionFilter::include("region", ["A", "B"]);
    assert_eq!(
        all.and(&include).unwrap(),
        DimensionFilter::include("region", ["A", "B"])
    );
    assert_eq!(
        include.and(&all).unwrap(),
        DimensionFilter::include("region", ["A", "B"])
    );
}

#[test]
fn test_or_rules() {
    let a = DimensionFilter::include("region", ["A"]);
    let b = DimensionFilter::include("region", ["B"]);
    assert_eq!(
        a.or(&b).unwrap(),
        DimensionFilter::include("region", ["A", "B"])
    );

    let all_but_a = DimensionFilter::all_except("region", ["A"]);
    let all_but_b = DimensionFilter::all_except("region", ["B"]);
    assert_eq!(
        all_but_a.or(&all_but_b).unwrap(),
        DimensionFilter::all_except("region", ["A", "B"])
    );
    assert_eq!(
        a.or(&DimensionFilter::all("region")).unwrap(),
        DimensionFilter::all("region")
    );
}

#[test]
fn test_not_swaps_modes() {
    let include_a = DimensionFilter::include("region", ["A"]);
    let negated = !&include_a;
    assert!(negated.all_values());
    assert!(negated.include_values().is_empty());
    assert_eq!(
        negated.exclude_values().iter().collect::<Vec<_>>(),
        ["A"]
    );
    assert_eq!(!negated, include_a);

    assert_eq!(
        !DimensionFilter::empty("region"),
        DimensionFilter::all("region")
    );
    assert_eq!(
        !DimensionFilter::all("region"),
        DimensionFilter::empty("region")
    );
}

#[test]
fn test_contains() {
    let all = DimensionFilter::all("region");
    let include_ab = DimensionFilter::include("region", ["A", "B"]);
    let include_a = DimensionFilter::include("region", ["A"]);

    assert!(all.contains(&include_a).unwrap());
    assert!(!include_a.contains(&all).unwrap());
    assert!(include_ab.contains(&include_a).unwrap());
    assert!(!include_a.contains(&include_ab).unwrap());
    assert!(include_a.contains(&DimensionFilter::empty("region")).unwrap());
}

#[test]
fn test_operators_reject_mismatched_dimensions() {
    let region = DimensionFilter::include("region", ["A"]);
    let zone = DimensionFilter::include("zone", ["A"]);
    let expected = PermissionError::DimensionMismatch {
        left: "region".to_string(),
        right: "zone".to_string(),
    };
    assert_eq!(region.and(&zone).unwrap_err(), expected);
    assert_eq!(region.or(&zone).unwrap_err(), expected);
    assert_eq!(region.contains(&zone).unwrap_err(), expected);
    assert!(region.to_string().contains("region"));
    assert!(expected.to_string().contains("zone"));
}

#[test]
fn test_wire_form() {
    let filter: DimensionFilter = serde_json::from_value(json!({
        "dimensionName": "region",
        "excludeValues": ["North"]
    }))
    .unwrap();
    assert_eq!(filter, DimensionFilter::all_except("region", ["North"]));
    assert_eq!(
        serde_json::to_value(&filter).unwrap(),
        json!({
            "dimensionName": "region",
            "includeValues": [],
            "excludeValues": ["North"],
            "allValues": true
        })
    );

    let conflicting = serde_json::from_value::<DimensionFilter>(json!({
        "dimensionName": "region",
        "includeValues": ["A"],
        "allValues": true
    }));
    assert!(conflicting.is_err());
}
