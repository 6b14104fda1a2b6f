//! Per-dimension value constraints.
//!
//! A [`DimensionFilter`] describes which values of one dimension are
//! permitted. It is in exactly one of three modes:
//!
//! | Mode | State | Meaning |
//! |------|-------|---------|
//! | EMPTY | nothing set | no values |
//! | INCLUDE | `include_values` non-empty | exactly these values |
//! | ALL | `all_values`, optional `exclude_values` | every value except the excluded ones |
//!
//! Filters are immutable; every operator returns a new filter.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Not;

use serde::{Deserialize, Serialize};

use super::error::{PermissionError, PermissionResult};

/// The active value mode of a [`DimensionFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    Empty,
    Include,
    All,
}

/// The permitted values of a single dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DimensionFilterSpec", into = "DimensionFilterSpec")]
pub struct DimensionFilter {
    dimension_name: String,
    include_values: BTreeSet<String>,
    exclude_values: BTreeSet<String>,
    all_values: bool,
    hash: u64,
}

impl DimensionFilter {
    /// Build a filter from raw attributes, rejecting conflicting modes.
    pub fn new<I, E, S, T>(
        dimension_name: impl Into<String>,
        include_values: I,
        exclude_values: E,
        all_values: bool,
    ) -> PermissionResult<Self>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Ok(Self::builder(dimension_name)
            .include_values(include_values)?
            .exclude_values(exclude_values)?
            .all_values(all_values)?
            .build())
    }

    pub fn builder(dimension_name: impl Into<String>) -> DimensionFilterBuilder {
        DimensionFilterBuilder {
            dimension_name: dimension_name.into(),
            ..Default::default()
        }
    }

    /// Exactly `values`.
    pub fn include<I, S>(dimension_name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_parts(
            dimension_name.into(),
            values.into_iter().map(Into::into).collect(),
            BTreeSet::new(),
            false,
        )
    }

    /// Every value.
    pub fn all(dimension_name: impl Into<String>) -> Self {
        Self::from_parts(dimension_name.into(), BTreeSet::new(), BTreeSet::new(), true)
    }

    /// Every value except `values`.
    pub fn all_except<I, S>(dimension_name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_parts(
            dimension_name.into(),
            BTreeSet::new(),
            values.into_iter().map(Into::into).collect(),
            true,
        )
    }

    /// No values.
    pub fn empty(dimension_name: impl Into<String>) -> Self {
        Self::from_parts(dimension_name.into(), BTreeSet::new(), BTreeSet::new(), false)
    }

    fn from_parts(
        dimension_name: String,
        include_values: BTreeSet<String>,
        exclude_values: BTreeSet<String>,
        all_values: bool,
    ) -> Self {
        let hash = content_hash(&dimension_name, &include_values, &exclude_values, all_values);
        Self {
            dimension_name,
            include_values,
            exclude_values,
            all_values,
            hash,
        }
    }

    pub fn dimension_name(&self) -> &str {
        &self.dimension_name
    }

    pub fn include_values(&self) -> &BTreeSet<String> {
        &self.include_values
    }

    pub fn exclude_values(&self) -> &BTreeSet<String> {
        &self.exclude_values
    }

    pub fn all_values(&self) -> bool {
        self.all_values
    }

    pub fn mode(&self) -> ValueMode {
        if self.all_values {
            ValueMode::All
        } else if !self.include_values.is_empty() {
            ValueMode::Include
        } else {
            ValueMode::Empty
        }
    }

    /// True when the filter sets anything at all.
    pub fn is_active(&self) -> bool {
        self.all_values || !self.include_values.is_empty() || !self.exclude_values.is_empty()
    }

    /// Whether `value` is permitted.
    pub fn permits(&self, value: &str) -> bool {
        if self.all_values {
            !self.exclude_values.contains(value)
        } else {
            self.include_values.contains(value)
        }
    }

    fn check_dimension(&self, other: &DimensionFilter) -> PermissionResult<()> {
        if self.dimension_name != other.dimension_name {
            return Err(PermissionError::DimensionMismatch {
                left: self.dimension_name.clone(),
                right: other.dimension_name.clone(),
            });
        }
        Ok(())
    }

    /// Intersection of permitted values.
    pub fn and(&self, other: &DimensionFilter) -> PermissionResult<DimensionFilter> {
        self.check_dimension(other)?;
        Ok(self.intersect(other))
    }

    /// Union of permitted values.
    pub fn or(&self, other: &DimensionFilter) -> PermissionResult<DimensionFilter> {
        self.check_dimension(other)?;
        Ok(self.union(other))
    }

    /// Whether every value `other` permits is permitted by `self`.
    pub fn contains(&self, other: &DimensionFilter) -> PermissionResult<bool> {
        self.check_dimension(other)?;
        Ok(self.covers(other))
    }

    /// Swap include and exclude sets and flip `all_values`.
    pub fn negate(&self) -> DimensionFilter {
        Self::from_parts(
            self.dimension_name.clone(),
            self.exclude_values.clone(),
            self.include_values.clone(),
            !self.all_values,
        )
    }

    // The unchecked forms below assume both sides share a dimension.

    pub(crate) fn intersect(&self, other: &DimensionFilter) -> DimensionFilter {
        if self == other {
            return self.clone();
        }
        let name = self.dimension_name.clone();
        match (self.all_values, other.all_values) {
            (true, true) => Self::from_parts(
                name,
                BTreeSet::new(),
                self.exclude_values
                    .intersection(&other.exclude_values)
                    .cloned()
                    .collect(),
                true,
            ),
            (true, false) => {
                Self::from_parts(name, other.include_values.clone(), BTreeSet::new(), false)
            }
            (false, true) => {
                Self::from_parts(name, self.include_values.clone(), BTreeSet::new(), false)
            }
            (false, false) => Self::from_parts(
                name,
                self.include_values
                    .intersection(&other.include_values)
                    .cloned()
                    .collect(),
                BTreeSet::new(),
                false,
            ),
        }
    }

    pub(crate) fn union(&self, other: &DimensionFilter) -> DimensionFilter {
        if self == other {
            return self.clone();
        }
        let name = self.dimension_name.clone();
        if self.all_values || other.all_values {
            Self::from_parts(
                name,
                BTreeSet::new(),
                self.exclude_values
                    .union(&other.exclude_values)
                    .cloned()
                    .collect(),
                true,
            )
        } else {
            Self::from_parts(
                name,
                self.include_values
                    .union(&other.include_values)
                    .cloned()
                    .collect(),
                BTreeSet::new(),
                false,
            )
        }
    }

    /// Exact intersection of the admitted value sets. `intersect` follows
    /// the grant-combination rules and may admit more than either side.
    pub(crate) fn meet(&self, other: &DimensionFilter) -> DimensionFilter {
        let name = self.dimension_name.clone();
        let (include, exclude) = match (self.all_values, other.all_values) {
            (true, true) => {
                let exclude = self.exclude_values.union(&other.exclude_values);
                return Self::from_parts(name, BTreeSet::new(), exclude.cloned().collect(), true);
            }
            (true, false) => (&other.include_values, &self.exclude_values),
            (false, true) => (&self.include_values, &other.exclude_values),
            (false, false) => {
                let include = self.include_values.intersection(&other.include_values);
                return Self::from_parts(name, include.cloned().collect(), BTreeSet::new(), false);
            }
        };
        let include = include.difference(exclude).cloned().collect();
        Self::from_parts(name, include, BTreeSet::new(), false)
    }

    /// Exact union of the admitted value sets. `union` follows the
    /// grant-combination rules and may admit less than either side.
    pub(crate) fn join(&self, other: &DimensionFilter) -> DimensionFilter {
        let name = self.dimension_name.clone();
        let exclude = match (self.all_values, other.all_values) {
            (true, true) => self
                .exclude_values
                .intersection(&other.exclude_values)
                .cloned()
                .collect(),
            (true, false) => self
                .exclude_values
                .difference(&other.include_values)
                .cloned()
                .collect(),
            (false, true) => other
                .exclude_values
                .difference(&self.include_values)
                .cloned()
                .collect(),
            (false, false) => {
                let include = self.include_values.union(&other.include_values);
                return Self::from_parts(name, include.cloned().collect(), BTreeSet::new(), false);
            }
        };
        Self::from_parts(name, BTreeSet::new(), exclude, true)
    }

    pub(crate) fn covers(&self, other: &DimensionFilter) -> bool {
        if self == other {
            return true;
        }
        if self.all_values {
            return self.exclude_values.is_subset(&other.exclude_values);
        }
        if other.all_values {
            return false;
        }
        other.include_values.is_subset(&self.include_values)
            && self.exclude_values.is_subset(&other.exclude_values)
    }

    pub(crate) fn content_hash(&self) -> u64 {
        self.hash
    }
}

impl Hash for DimensionFilter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl Not for DimensionFilter {
    type Output = DimensionFilter;

    fn not(self) -> DimensionFilter {
        self.negate()
    }
}

impl Not for &DimensionFilter {
    type Output = DimensionFilter;

    fn not(self) -> DimensionFilter {
        self.negate()
    }
}

impl fmt::Display for DimensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &BTreeSet<String>| {
            values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        };
        match self.mode() {
            ValueMode::All if self.exclude_values.is_empty() => {
                write!(f, "{}: all", self.dimension_name)
            }
            ValueMode::All => write!(
                f,
                "{}: all except [{}]",
                self.dimension_name,
                join(&self.exclude_values)
            ),
            ValueMode::Include => write!(
                f,
                "{}: [{}]",
                self.dimension_name,
                join(&self.include_values)
            ),
            ValueMode::Empty => write!(f, "{}: none", self.dimension_name),
        }
    }
}

/// Order-independent hash: wrapping sum of per-element hashes.
fn content_hash(
    dimension_name: &str,
    include_values: &BTreeSet<String>,
    exclude_values: &BTreeSet<String>,
    all_values: bool,
) -> u64 {
    let mut sum = element_hash(0, dimension_name).wrapping_add(element_hash(1, &all_values));
    for value in include_values {
        sum = sum.wrapping_add(element_hash(2, value));
    }
    for value in exclude_values {
        sum = sum.wrapping_add(element_hash(3, value));
    }
    sum
}

fn element_hash<T: Hash + ?Sized>(slot: u8, value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    slot.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

/// Incremental construction of a [`DimensionFilter`].
///
/// Each setter fails as soon as it would activate a second value mode.
/// Exclusions without `all_values` mean "everything except", so they
/// build an ALL-mode filter.
#[derive(Debug, Clone, Default)]
pub struct DimensionFilterBuilder {
    dimension_name: String,
    include_values: BTreeSet<String>,
    exclude_values: BTreeSet<String>,
    all_values: bool,
}

impl DimensionFilterBuilder {
    pub fn include_values<I, S>(mut self, values: I) -> PermissionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            let mut conflicts = Vec::new();
            if !self.exclude_values.is_empty() {
                conflicts.push("exclude_values");
            }
            if self.all_values {
                conflicts.push("all_values");
            }
            self.reject("include_values", conflicts)?;
        }
        self.include_values.extend(values);
        Ok(self)
    }

    pub fn exclude_values<I, S>(mut self, values: I) -> PermissionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() && !self.include_values.is_empty() {
            self.reject("exclude_values", vec!["include_values"])?;
        }
        self.exclude_values.extend(values);
        Ok(self)
    }

    pub fn all_values(mut self, all_values: bool) -> PermissionResult<Self> {
        if all_values && !self.include_values.is_empty() {
            self.reject("all_values", vec!["include_values"])?;
        }
        self.all_values = all_values;
        Ok(self)
    }

    pub fn build(self) -> DimensionFilter {
        let all_values = self.all_values || !self.exclude_values.is_empty();
        DimensionFilter::from_parts(
            self.dimension_name,
            self.include_values,
            self.exclude_values,
            all_values,
        )
    }

    fn reject(&self, setting: &'static str, conflicts: Vec<&'static str>) -> PermissionResult<()> {
        if conflicts.is_empty() {
            return Ok(());
        }
        let mut fields = conflicts;
        fields.insert(0, setting);
        Err(PermissionError::ConflictingModes {
            dimension: self.dimension_name.clone(),
            fields,
        })
    }
}

/// Wire form of a [`DimensionFilter`], as supplied by the grant store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilterSpec {
    pub dimension_name: String,
    #[serde(default)]
    pub include_values: BTreeSet<String>,
    #[serde(default)]
    pub exclude_values: BTreeSet<String>,
    #[serde(default)]
    pub all_values: bool,
}

impl TryFrom<DimensionFilterSpec> for DimensionFilter {
    type Error = PermissionError;

    fn try_from(spec: DimensionFilterSpec) -> PermissionResult<Self> {
        DimensionFilter::new(
            spec.dimension_name,
            spec.include_values,
            spec.exclude_values,
            spec.all_values,
        )
    }
}

impl From<DimensionFilter> for DimensionFilterSpec {
    fn from(filter: DimensionFilter) -> Self {
        Self {
            dimension_name: filter.dimension_name,
            include_values: filter.include_values,
            exclude_values: filter.exclude_values,
            all_values: filter.all_values,
        }
    }
}
