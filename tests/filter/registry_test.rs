use prism::backend::Predicate;
use prism::filter::{
    DeserializeError, DeserializeLimits, DeserializeResult, FilterInput, FilterRegistry,
    NodeReader, QueryFilter, RegistryError,
};
use serde_json::json;

fn registry() -> FilterRegistry {
    FilterRegistry::standard()
}

fn sample_filters() -> Vec<QueryFilter> {
    vec![
        QueryFilter::selector("region", "East"),
        QueryFilter::in_values("facility", ["F2", "F1"]),
        QueryFilter::field("indicator-1"),
        QueryFilter::field_in(["indicator-1", "indicator-2"]),
        QueryFilter::raw(Predicate::Native(json!({
            "type": "bound",
            "dimension": "age",
            "lower": "5"
        }))),
        QueryFilter::and(vec![
            QueryFilter::selector("region", "East"),
            QueryFilter::or(vec![
                QueryFilter::selector("zone", "Z1"),
                QueryFilter::not(QueryFilter::field("indicator-9")),
            ]),
        ]),
        QueryFilter::not(QueryFilter::in_values("region", ["North"])),
        QueryFilter::and(vec![]),
    ]
}

#[test]
fn test_round_trip_every_variant() {
    let registry = registry();
    for filter in sample_filters() {
        let wire = filter.to_json();
        let decoded = registry.deserialize(&wire).unwrap();
        assert_eq!(decoded.as_ref(), Some(&filter), "round trip of {}", wire);
    }
}

#[test]
fn test_round_trip_through_serde() {
    for filter in sample_filters() {
        let text = serde_json::to_string(&filter).unwrap();
        let decoded: QueryFilter = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, filter);
    }
}

#[test]
fn test_wire_form_uses_camel_case_members() {
    let wire = QueryFilter::field_in(["b", "a"]).to_json();
    assert_eq!(wire, json!({"type": "FIELD_IN", "fieldIds": ["a", "b"]}));
}

#[test]
fn test_empty_object_is_no_filter() {
    assert_eq!(registry().deserialize(&json!({})).unwrap(), None);
    assert_eq!(registry().deserialize(&json!(null)).unwrap(), None);
}

#[test]
fn test_empty_object_inside_tree_is_rejected() {
    let err = registry()
        .deserialize(&json!({"type": "AND", "fields": [{}]}))
        .unwrap_err();
    assert_eq!(
        err,
        DeserializeError::EmptyNested {
            field: "fields[0]".to_string()
        }
    );
}

#[test]
fn test_unknown_tag_is_rejected() {
    let err = registry()
        .deserialize(&json!({"type": "BOGUS"}))
        .unwrap_err();
    assert!(matches!(err, DeserializeError::UnknownTag { ref tag, .. } if tag == "BOGUS"));
}

#[test]
fn test_missing_tag_and_non_objects() {
    let registry = registry();
    assert!(matches!(
        registry.deserialize(&json!({"dimension": "region"})),
        Err(DeserializeError::MissingTag { .. })
    ));
    assert!(matches!(
        registry.deserialize(&json!("SELECTOR")),
        Err(DeserializeError::NotAnObject { found: "a string", .. })
    ));
}

#[test]
fn test_missing_and_invalid_fields() {
    let registry = registry();
    assert!(matches!(
        registry.deserialize(&json!({"type": "SELECTOR", "dimension": "region"})),
        Err(DeserializeError::MissingField { field: "value", .. })
    ));
    assert!(matches!(
        registry.deserialize(&json!({"type": "IN", "dimension": "region", "values": "East"})),
        Err(DeserializeError::InvalidField { field: "values", .. })
    ));
}

#[test]
fn test_nested_errors_keep_outer_context() {
    let err = registry()
        .deserialize(&json!({
            "type": "AND",
            "fields": [
                {"type": "SELECTOR", "dimension": "region", "value": "East"},
                {"type": "NOT", "field": {"type": "BOGUS"}}
            ]
        }))
        .unwrap_err();

    assert_eq!(err.path(), "fields[1].field");
    assert!(matches!(
        err.root_cause(),
        DeserializeError::UnknownTag { tag, .. } if tag == "BOGUS"
    ));
    assert_eq!(
        err.to_string(),
        "In 'fields[1]': In 'field': Unknown QueryFilter type 'BOGUS'"
    );
}

#[test]
fn test_depth_limit() {
    let registry = FilterRegistry::standard().with_limits(DeserializeLimits {
        max_depth: 2,
        ..DeserializeLimits::default()
    });
    let shallow = json!({"type": "NOT", "field": {"type": "FIELD", "fieldId": "x"}});
    assert!(registry.deserialize(&shallow).is_ok());

    let deep = json!({"type": "NOT", "field": shallow});
    let err = registry.deserialize(&deep).unwrap_err();
    assert_eq!(err.root_cause(), &DeserializeError::DepthExceeded { max: 2 });
}

#[test]
fn test_width_limit() {
    let registry = FilterRegistry::standard().with_limits(DeserializeLimits {
        max_width: 2,
        ..DeserializeLimits::default()
    });
    let err = registry
        .deserialize(&json!({"type": "IN", "dimension": "region", "values": ["A", "B", "C"]}))
        .unwrap_err();
    assert_eq!(
        err,
        DeserializeError::WidthExceeded {
            field: "values".to_string(),
            len: 3,
            max: 2
        }
    );
}

#[test]
fn test_simple_payload_shares_depth_limit() {
    let registry = FilterRegistry::standard().with_limits(DeserializeLimits {
        max_depth: 3,
        ..DeserializeLimits::default()
    });
    let selector = json!({"type": "selector", "dimension": "region", "value": "East"});
    let fits = json!({"type": "SIMPLE", "filter": {"type": "not", "field": selector}});
    assert!(registry.deserialize(&fits).is_ok());

    let too_deep = json!({
        "type": "SIMPLE",
        "filter": {"type": "not", "field": {"type": "not", "field": selector}}
    });
    let err = registry.deserialize(&too_deep).unwrap_err();
    assert_eq!(err.path(), "filter");
    assert_eq!(err.root_cause(), &DeserializeError::DepthExceeded { max: 3 });

    // The enclosing tree uses up part of the budget.
    let under_and = json!({"type": "AND", "fields": [fits]});
    let err = registry.deserialize(&under_and).unwrap_err();
    assert_eq!(err.path(), "fields[0].filter");
    assert_eq!(err.root_cause(), &DeserializeError::DepthExceeded { max: 3 });
}

#[test]
fn test_simple_payload_shares_width_limit() {
    let registry = FilterRegistry::standard().with_limits(DeserializeLimits {
        max_width: 3,
        ..DeserializeLimits::default()
    });
    let selectors: Vec<_> = (0..50)
        .map(|i| json!({"type": "selector", "dimension": "zone", "value": format!("Z{}", i)}))
        .collect();
    let err = registry
        .deserialize(&json!({"type": "SIMPLE", "filter": {"type": "or", "fields": selectors}}))
        .unwrap_err();
    assert_eq!(
        err,
        DeserializeError::Nested {
            path: "filter".to_string(),
            source: Box::new(DeserializeError::WidthExceeded {
                field: "fields".to_string(),
                len: 50,
                max: 3
            }),
        }
    );

    let err = registry
        .deserialize(&json!({
            "type": "SIMPLE",
            "filter": {"type": "in", "dimension": "zone", "values": ["Z1", "Z2", "Z3", "Z4"]}
        }))
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        DeserializeError::WidthExceeded { field, len: 4, max: 3 } if field == "values"
    ));
}

#[test]
fn test_deserialize_many_keeps_positions() {
    let decoded = registry()
        .deserialize_many(&json!([
            {"type": "FIELD", "fieldId": "a"},
            {},
            null,
            {"type": "SELECTOR", "dimension": "region", "value": "East"}
        ]))
        .unwrap();
    assert_eq!(
        decoded,
        vec![
            Some(QueryFilter::field("a")),
            None,
            None,
            Some(QueryFilter::selector("region", "East")),
        ]
    );
}

#[test]
fn test_deserialize_many_reports_index() {
    let err = registry()
        .deserialize_many(&json!([{"type": "FIELD", "fieldId": "a"}, {"type": "BOGUS"}]))
        .unwrap_err();
    assert_eq!(err.path(), "[1]");
}

#[test]
fn test_resolve_is_idempotent() {
    let registry = registry();
    let filter = QueryFilter::selector("region", "East");
    assert_eq!(registry.resolve(filter.clone()).unwrap(), Some(filter.clone()));
    assert_eq!(
        registry.resolve(FilterInput::Json(filter.to_json())).unwrap(),
        Some(filter)
    );
}

fn decode_equals(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::selector(
        node.string("dimension")?,
        node.string("value")?,
    ))
}

#[test]
fn test_custom_registration() {
    let mut registry = FilterRegistry::standard();
    registry.register("EQUALS", decode_equals).unwrap();
    assert_eq!(
        registry.register("EQUALS", decode_equals),
        Err(RegistryError::DuplicateTag("EQUALS".to_string()))
    );

    let decoded = registry
        .deserialize(&json!({
            "type": "OR",
            "fields": [{"type": "EQUALS", "dimension": "region", "value": "East"}]
        }))
        .unwrap();
    assert_eq!(
        decoded,
        Some(QueryFilter::or(vec![QueryFilter::selector("region", "East")]))
    );
}

#[test]
fn test_registries_are_isolated() {
    let mut custom = FilterRegistry::standard();
    custom.register("EQUALS", decode_equals).unwrap();
    assert!(custom.is_registered("EQUALS"));
    assert!(!FilterRegistry::standard().is_registered("EQUALS"));
}
