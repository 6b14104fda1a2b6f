use std::collections::HashMap;
use std::sync::Arc;

use prism::cache::NeedCache;
use prism::filter::{FilterRegistry, QueryFilter};
use prism::permission::{
    need_from_filter, Authorizer, DimensionFilter, GrantProvider, MissingDimensionPolicy,
    QueryNeed,
};
use serde_json::json;

fn district_officer() -> Authorizer {
    Authorizer::from_grants([
        DimensionFilter::include("region", ["East"]),
        DimensionFilter::all("facility"),
    ])
}

#[test]
fn test_query_inside_grant_is_permitted() {
    let filter = FilterRegistry::standard()
        .deserialize(&json!({
            "type": "AND",
            "fields": [
                {"type": "SELECTOR", "dimension": "region", "value": "East"},
                {"type": "FIELD", "fieldId": "malaria-cases"}
            ]
        }))
        .unwrap();
    assert!(district_officer().permits(filter.as_ref()));
}

#[test]
fn test_query_outside_grant_is_denied() {
    let filter = QueryFilter::in_values("region", ["East", "West"]);
    assert!(!district_officer().permits(Some(&filter)));
}

#[test]
fn test_unfiltered_query_needs_full_grant() {
    assert!(!district_officer().permits(None));
    let admin = Authorizer::from_grants([DimensionFilter::all("region")]);
    assert!(admin.permits(None));
    assert!(admin.permits(Some(&QueryFilter::field("anything"))));
}

#[test]
fn test_required_need_fills_open_dimensions() {
    let filter = QueryFilter::selector("region", "East");
    let required = district_officer().required_need(Some(&filter));
    assert_eq!(
        required,
        QueryNeed::new([
            DimensionFilter::include("region", ["East"]),
            DimensionFilter::all("facility"),
        ])
    );
}

#[test]
fn test_excluded_values_block_unfiltered_reads() {
    let grant = Authorizer::from_grants([DimensionFilter::all_except("facility", ["F-closed"])]);
    assert!(!grant.permits(None));
    let open = QueryFilter::not(QueryFilter::selector("facility", "F-closed"));
    assert!(grant.permits(Some(&open)));
}

#[test]
fn test_negated_selector_within_all_grant() {
    let grant = Authorizer::from_grants([DimensionFilter::all_except("region", ["North"])]);
    let filter = QueryFilter::not(QueryFilter::in_values("region", ["North", "South"]));
    assert!(grant.permits(Some(&filter)));

    let wider = QueryFilter::not(QueryFilter::selector("region", "South"));
    assert!(!grant.permits(Some(&wider)));
}

#[test]
fn test_or_across_dimensions_is_unconstrained() {
    let filter = QueryFilter::or(vec![
        QueryFilter::selector("region", "East"),
        QueryFilter::selector("facility", "F1"),
    ]);
    assert_eq!(need_from_filter(&filter), None);
    assert!(!district_officer().permits(Some(&filter)));
}

#[test]
fn test_and_across_dimensions_keeps_both_constraints() {
    let filter = QueryFilter::and(vec![
        QueryFilter::selector("region", "East"),
        QueryFilter::selector("facility", "F1"),
    ]);
    assert!(district_officer().permits(Some(&filter)));

    let west_only = Authorizer::from_grants([DimensionFilter::include("region", ["West"])]);
    assert!(!west_only.permits(Some(&filter)));
}

#[test]
fn test_grant_policy_never_widens_queries() {
    let filter = QueryFilter::and(vec![
        QueryFilter::selector("region", "East"),
        QueryFilter::selector("facility", "F1"),
    ]);
    let west = || {
        vec![
            QueryNeed::new([DimensionFilter::include("region", ["West"])]),
            QueryNeed::new([DimensionFilter::all("facility")]),
        ]
    };
    for policy in [
        MissingDimensionPolicy::Drop,
        MissingDimensionPolicy::Unconstrained,
        MissingDimensionPolicy::Deny,
    ] {
        let authorizer = Authorizer::from_grant_sets(west(), policy);
        assert!(!authorizer.permits(Some(&filter)), "{:?}", policy);
    }
}

#[test]
fn test_negating_a_partly_analysable_filter_is_unconstrained() {
    let grant = Authorizer::from_grants([DimensionFilter::all_except("region", ["East"])]);
    let filter = QueryFilter::not(QueryFilter::and(vec![
        QueryFilter::selector("region", "East"),
        QueryFilter::field("f1"),
    ]));
    assert_eq!(need_from_filter(&filter), None);
    assert!(!grant.permits(Some(&filter)));
}

#[test]
fn test_negating_a_loose_or_is_unconstrained() {
    let grant = Authorizer::from_grants([
        DimensionFilter::all_except("region", ["East"]),
        DimensionFilter::all("facility"),
    ]);
    // Bounded to region East or West on the region dimension, but the
    // facility constraint is lost, so the negation would be too narrow.
    let loose = QueryFilter::or(vec![
        QueryFilter::and(vec![
            QueryFilter::selector("region", "East"),
            QueryFilter::selector("facility", "F1"),
        ]),
        QueryFilter::selector("region", "West"),
    ]);
    assert!(need_from_filter(&loose).is_some());
    assert!(!grant.permits(Some(&QueryFilter::not(loose))));
}

#[test]
fn test_or_of_negations_reads_every_value() {
    let grant = Authorizer::from_grants([DimensionFilter::all_except("region", ["A", "B"])]);
    let filter = QueryFilter::or(vec![
        QueryFilter::not(QueryFilter::selector("region", "A")),
        QueryFilter::not(QueryFilter::selector("region", "B")),
    ]);
    assert!(!grant.permits(Some(&filter)));

    let both = QueryFilter::and(vec![
        QueryFilter::not(QueryFilter::selector("region", "A")),
        QueryFilter::not(QueryFilter::selector("region", "B")),
    ]);
    assert!(grant.permits(Some(&both)));
}

#[test]
fn test_unknown_principal_is_denied() {
    let grants: HashMap<String, Vec<DimensionFilter>> = HashMap::new();
    let authorizer = Authorizer::from_grants(grants.grants_for("mallory"));
    assert!(!authorizer.permits(Some(&QueryFilter::selector("region", "East"))));
}

#[test]
fn test_cached_grants_feed_authorizer() {
    let mut grants: HashMap<String, Vec<DimensionFilter>> = HashMap::new();
    grants.insert(
        "alice".to_string(),
        vec![
            DimensionFilter::include("region", ["East"]),
            DimensionFilter::include("region", ["West"]),
        ],
    );

    let cache = NeedCache::new();
    let need = cache.need_for(&grants, "alice").unwrap();
    assert!(Arc::ptr_eq(&need, &cache.need_for(&grants, "alice").unwrap()));

    let authorizer = Authorizer::new(need.as_ref().clone());
    assert!(authorizer.permits(Some(&QueryFilter::in_values("region", ["East", "West"]))));
    assert!(grants.grants_for("mallory").is_empty());
}
