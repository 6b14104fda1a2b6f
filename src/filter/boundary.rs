//! Geo boundary extraction for map visualizations.
//!
//! Walks a filter tree and pulls out the combinations of geo-dimension
//! values it selects, split into boundaries to draw (`include`) and
//! boundaries to leave out (`exclude`). This is a best-effort reading of the
//! shapes the query builder produces, not a constraint solver: anything it
//! cannot read exactly is left out rather than approximated.

use std::collections::BTreeMap;

use serde::Serialize;

use super::node::QueryFilter;

/// One boundary: geo dimension -> selected value.
pub type GeoSelection = BTreeMap<String, String>;

/// Boundaries selected by a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoundaryFilters {
    pub include: Vec<GeoSelection>,
    pub exclude: Vec<GeoSelection>,
}

impl BoundaryFilters {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn target(&mut self, negated: bool) -> &mut Vec<GeoSelection> {
        if negated {
            &mut self.exclude
        } else {
            &mut self.include
        }
    }
}

/// Extract include/exclude boundaries from `filter`.
///
/// - `Selector` on a geo dimension yields one single-entry boundary.
/// - `And` made only of selectors on distinct geo dimensions yields one
///   combined boundary; any other `And` is searched child by child.
/// - `Or` yields one boundary per child only if every child reads as a
///   boundary; otherwise the whole `Or` yields nothing.
/// - `Not` sends whatever its child yields to the other list.
/// - `In`, field filters and raw predicates yield nothing.
pub fn extract_boundaries<S: AsRef<str>>(
    filter: Option<&QueryFilter>,
    geo_dimensions: &[S],
) -> BoundaryFilters {
    let extractor = BoundaryExtractor { geo_dimensions };
    let mut out = BoundaryFilters::default();
    if let Some(filter) = filter {
        extractor.walk(filter, false, &mut out);
    }
    out
}

struct BoundaryExtractor<'a, S> {
    geo_dimensions: &'a [S],
}

impl<S: AsRef<str>> BoundaryExtractor<'_, S> {
    fn is_geo(&self, dimension: &str) -> bool {
        self.geo_dimensions.iter().any(|g| g.as_ref() == dimension)
    }

    fn walk(&self, filter: &QueryFilter, negated: bool, out: &mut BoundaryFilters) {
        match filter {
            QueryFilter::Selector { dimension, value } => {
                if self.is_geo(dimension) {
                    out.target(negated)
                        .push(GeoSelection::from([(dimension.clone(), value.clone())]));
                }
            }
            QueryFilter::And { fields } => match self.flat_selection(filter) {
                Some(selection) => out.target(negated).push(selection),
                None => {
                    for field in fields {
                        self.walk(field, negated, out);
                    }
                }
            },
            QueryFilter::Or { fields } => {
                let selections: Option<Vec<GeoSelection>> =
                    fields.iter().map(|f| self.flat_selection(f)).collect();
                if let Some(selections) = selections {
                    out.target(negated).extend(selections);
                }
            }
            QueryFilter::Not { field } => self.walk(field, !negated, out),
            QueryFilter::In { .. }
            | QueryFilter::FieldEquals { .. }
            | QueryFilter::FieldIn { .. }
            | QueryFilter::Raw { .. } => {}
        }
    }

    /// Read a node as exactly one boundary: a geo selector, or a non-empty
    /// `And` of selectors on distinct geo dimensions.
    fn flat_selection(&self, filter: &QueryFilter) -> Option<GeoSelection> {
        match filter {
            QueryFilter::Selector { dimension, value } if self.is_geo(dimension) => {
                Some(GeoSelection::from([(dimension.clone(), value.clone())]))
            }
            QueryFilter::And { fields } if !fields.is_empty() => {
                let mut selection = GeoSelection::new();
                for field in fields {
                    match field {
                        QueryFilter::Selector { dimension, value }
                            if self.is_geo(dimension) && !selection.contains_key(dimension) =>
                        {
                            selection.insert(dimension.clone(), value.clone());
                        }
                        _ => return None,
                    }
                }
                Some(selection)
            }
            _ => None,
        }
    }
}
