//! The data a principal may see, as one filter per dimension.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::ops::Not;

use serde::{Deserialize, Serialize};

use super::dimension::DimensionFilter;
use crate::cache::compute_hash;

/// How [`QueryNeed::and_with`] treats a dimension only one side constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDimensionPolicy {
    /// Leave the dimension out of the result.
    #[default]
    Drop,
    /// Absent means every value: keep the constraining side's filter.
    Unconstrained,
    /// Absent means no value: the dimension permits nothing.
    Deny,
}

/// A bundle of [`DimensionFilter`]s, at most one per dimension.
///
/// Built once from a principal's grants; every operator returns a new need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DimensionFilter>", into = "Vec<DimensionFilter>")]
pub struct QueryNeed {
    dimension_to_filter: BTreeMap<String, DimensionFilter>,
}

impl QueryNeed {
    /// Merge `filters`, OR-ing filters that share a dimension.
    pub fn new(filters: impl IntoIterator<Item = DimensionFilter>) -> Self {
        let mut dimension_to_filter = BTreeMap::new();
        for filter in filters {
            match dimension_to_filter.entry(filter.dimension_name().to_string()) {
                Entry::Vacant(entry) => {
                    entry.insert(filter);
                }
                Entry::Occupied(mut entry) => {
                    let merged = entry.get().union(&filter);
                    entry.insert(merged);
                }
            }
        }
        Self {
            dimension_to_filter,
        }
    }

    pub fn get(&self, dimension: &str) -> Option<&DimensionFilter> {
        self.dimension_to_filter.get(dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.dimension_to_filter.keys().map(String::as_str)
    }

    pub fn filters(&self) -> impl Iterator<Item = &DimensionFilter> {
        self.dimension_to_filter.values()
    }

    pub fn into_filters(self) -> impl Iterator<Item = DimensionFilter> {
        self.dimension_to_filter.into_values()
    }

    pub fn len(&self) -> usize {
        self.dimension_to_filter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimension_to_filter.is_empty()
    }

    /// Whether `self` satisfies everything `other` requires.
    ///
    /// `self` must address every dimension `other` does, and each of its
    /// filters must contain the matching filter of `other`.
    pub fn contains(&self, other: &QueryNeed) -> bool {
        if !other
            .dimension_to_filter
            .keys()
            .all(|d| self.dimension_to_filter.contains_key(d))
        {
            return false;
        }
        other
            .dimension_to_filter
            .iter()
            .all(|(dimension, filter)| self.dimension_to_filter[dimension].covers(filter))
    }

    /// AND with the [`MissingDimensionPolicy::Drop`] policy: only dimensions
    /// both sides address survive.
    pub fn and(&self, other: &QueryNeed) -> QueryNeed {
        self.and_with(other, MissingDimensionPolicy::Drop)
    }

    /// AND shared dimensions; treat one-sided dimensions per `policy`.
    pub fn and_with(&self, other: &QueryNeed, policy: MissingDimensionPolicy) -> QueryNeed {
        if self == other {
            return self.clone();
        }

        let mut dimension_to_filter = BTreeMap::new();
        for (dimension, filter) in &self.dimension_to_filter {
            let combined = match other.dimension_to_filter.get(dimension) {
                Some(other_filter) => Some(filter.intersect(other_filter)),
                None => one_sided(filter, policy),
            };
            if let Some(combined) = combined {
                dimension_to_filter.insert(dimension.clone(), combined);
            }
        }
        for (dimension, filter) in &other.dimension_to_filter {
            if self.dimension_to_filter.contains_key(dimension) {
                continue;
            }
            if let Some(combined) = one_sided(filter, policy) {
                dimension_to_filter.insert(dimension.clone(), combined);
            }
        }

        Self {
            dimension_to_filter,
        }
    }

    /// OR shared dimensions. A dimension only one side constrains is
    /// unconstrained in the union, so it is left out.
    pub fn or(&self, other: &QueryNeed) -> QueryNeed {
        if self == other {
            return self.clone();
        }

        let dimension_to_filter = self
            .dimension_to_filter
            .iter()
            .filter_map(|(dimension, filter)| {
                other
                    .dimension_to_filter
                    .get(dimension)
                    .map(|other_filter| (dimension.clone(), filter.union(other_filter)))
            })
            .collect();

        Self {
            dimension_to_filter,
        }
    }

    /// Negate every dimension's filter independently.
    pub fn negate(&self) -> QueryNeed {
        Self {
            dimension_to_filter: self
                .dimension_to_filter
                .iter()
                .map(|(dimension, filter)| (dimension.clone(), filter.negate()))
                .collect(),
        }
    }

    /// SHA-256 of the canonical JSON form, for use as a cache key.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        compute_hash(self)
    }
}

fn one_sided(filter: &DimensionFilter, policy: MissingDimensionPolicy) -> Option<DimensionFilter> {
    match policy {
        MissingDimensionPolicy::Drop => None,
        MissingDimensionPolicy::Unconstrained => Some(filter.clone()),
        MissingDimensionPolicy::Deny => Some(DimensionFilter::empty(filter.dimension_name())),
    }
}

impl Hash for QueryNeed {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sum = self
            .dimension_to_filter
            .values()
            .fold(0u64, |acc, f| acc.wrapping_add(f.content_hash()));
        state.write_u64(sum);
    }
}

impl Not for QueryNeed {
    type Output = QueryNeed;

    fn not(self) -> QueryNeed {
        self.negate()
    }
}

impl Not for &QueryNeed {
    type Output = QueryNeed;

    fn not(self) -> QueryNeed {
        self.negate()
    }
}

impl FromIterator<DimensionFilter> for QueryNeed {
    fn from_iter<T: IntoIterator<Item = DimensionFilter>>(iter: T) -> Self {
        QueryNeed::new(iter)
    }
}

impl From<Vec<DimensionFilter>> for QueryNeed {
    fn from(filters: Vec<DimensionFilter>) -> Self {
        QueryNeed::new(filters)
    }
}

impl From<QueryNeed> for Vec<DimensionFilter> {
    fn from(need: QueryNeed) -> Self {
        need.into_filters().collect()
    }
}
