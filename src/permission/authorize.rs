//! Access decisions: derive what a query touches and check it against a grant.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use super::dimension::DimensionFilter;
use super::need::{MissingDimensionPolicy, QueryNeed};
use crate::filter::QueryFilter;

/// The data slice `filter` restricts a query to, or `None` when the filter
/// cannot be bounded per dimension (field and raw filters, mixed ORs).
///
/// The result never admits less than the filter matches. `None` means the
/// query is unconstrained on every dimension.
pub fn need_from_filter(filter: &QueryFilter) -> Option<QueryNeed> {
    Bounds::derive(filter).map(|bounds| bounds.filters.into_values().collect())
}

/// Per-dimension bounds on the rows a filter matches. Unless `exact`, the
/// bounds only over-approximate them and cannot be negated.
struct Bounds {
    filters: BTreeMap<String, DimensionFilter>,
    exact: bool,
}

impl Bounds {
    fn single(filter: DimensionFilter) -> Self {
        Self {
            filters: BTreeMap::from([(filter.dimension_name().to_string(), filter)]),
            exact: true,
        }
    }

    fn derive(filter: &QueryFilter) -> Option<Bounds> {
        match filter {
            QueryFilter::Selector { dimension, value } => Some(Bounds::single(
                DimensionFilter::include(dimension.as_str(), [value.as_str()]),
            )),
            QueryFilter::In { dimension, values } => Some(Bounds::single(
                DimensionFilter::include(dimension.as_str(), values.iter().map(String::as_str)),
            )),
            QueryFilter::FieldEquals { .. }
            | QueryFilter::FieldIn { .. }
            | QueryFilter::Raw { .. } => None,
            QueryFilter::And { fields } => {
                let mut exact = true;
                let mut bounds: Option<Bounds> = None;
                for field in fields {
                    match Bounds::derive(field) {
                        Some(next) => {
                            bounds = Some(match bounds {
                                Some(acc) => acc.meet(next),
                                None => next,
                            })
                        }
                        // An unbounded conjunct only narrows the query.
                        None => exact = false,
                    }
                }
                bounds.map(|mut bounds| {
                    bounds.exact &= exact;
                    bounds
                })
            }
            QueryFilter::Or { fields } => {
                let mut bounds: Option<Bounds> = None;
                for field in fields {
                    let next = Bounds::derive(field)?;
                    bounds = Some(match bounds {
                        Some(acc) => acc.join(next),
                        None => next,
                    });
                }
                bounds.filter(|bounds| !bounds.filters.is_empty())
            }
            QueryFilter::Not { field } => {
                let inner = Bounds::derive(field)?;
                if !inner.exact || inner.filters.len() != 1 {
                    return None;
                }
                let filters = inner
                    .filters
                    .into_iter()
                    .map(|(dimension, filter)| (dimension, filter.negate()))
                    .collect();
                Some(Bounds {
                    filters,
                    exact: true,
                })
            }
        }
    }

    /// Conjunction: dimensions from either side, shared ones intersected.
    fn meet(mut self, other: Bounds) -> Bounds {
        for (dimension, filter) in other.filters {
            let merged = match self.filters.get(&dimension) {
                Some(existing) => existing.meet(&filter),
                None => filter,
            };
            self.filters.insert(dimension, merged);
        }
        self.exact &= other.exact;
        self
    }

    /// Disjunction: only shared dimensions stay bounded. Exact only when
    /// both sides bound the same single dimension exactly.
    fn join(self, other: Bounds) -> Bounds {
        let exact = self.exact
            && other.exact
            && self.filters.len() == 1
            && self.filters.keys().eq(other.filters.keys());
        let filters = self
            .filters
            .iter()
            .filter_map(|(dimension, filter)| {
                let theirs = other.filters.get(dimension)?;
                Some((dimension.clone(), filter.join(theirs)))
            })
            .collect();
        Bounds { filters, exact }
    }
}

/// Source of per-principal grants.
pub trait GrantProvider {
    /// The filters granted to `principal`; an unknown principal has none.
    fn grants_for(&self, principal: &str) -> Vec<DimensionFilter>;
}

impl GrantProvider for HashMap<String, Vec<DimensionFilter>> {
    fn grants_for(&self, principal: &str) -> Vec<DimensionFilter> {
        self.get(principal).cloned().unwrap_or_default()
    }
}

/// Decides whether queries stay inside a principal's grant.
#[derive(Debug, Clone)]
pub struct Authorizer {
    grant: QueryNeed,
}

impl Authorizer {
    pub fn new(grant: QueryNeed) -> Self {
        Self { grant }
    }

    pub fn from_grants(grants: impl IntoIterator<Item = DimensionFilter>) -> Self {
        Self::new(QueryNeed::new(grants))
    }

    /// A principal holding several grant sets (role, organisation, ...) may
    /// only read what all of them allow. `policy` decides dimensions that
    /// only some of the sets mention.
    pub fn from_grant_sets(
        sets: impl IntoIterator<Item = QueryNeed>,
        policy: MissingDimensionPolicy,
    ) -> Self {
        let grant = sets
            .into_iter()
            .reduce(|acc, set| acc.and_with(&set, policy))
            .unwrap_or_default();
        Self::new(grant)
    }

    pub fn grant(&self) -> &QueryNeed {
        &self.grant
    }

    /// The need `filter` imposes, projected onto the granted dimensions.
    ///
    /// Granted dimensions the filter leaves open are required in full;
    /// dimensions the grant does not mention are ignored.
    pub fn required_need(&self, filter: Option<&QueryFilter>) -> QueryNeed {
        let derived = filter.and_then(need_from_filter);
        self.grant
            .dimensions()
            .map(|dimension| {
                derived
                    .as_ref()
                    .and_then(|need| need.get(dimension))
                    .cloned()
                    .unwrap_or_else(|| DimensionFilter::all(dimension))
            })
            .collect()
    }

    /// Whether a query restricted by `filter` only reads granted data. A
    /// grant that addresses no dimension permits nothing.
    pub fn permits(&self, filter: Option<&QueryFilter>) -> bool {
        let required = self.required_need(filter);
        let permitted = !self.grant.is_empty() && self.grant.contains(&required);
        debug!(
            "authorization {}: required [{}]",
            if permitted { "granted" } else { "denied" },
            required
                .filters()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        );
        permitted
    }
}
