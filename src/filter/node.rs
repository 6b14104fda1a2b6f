//! The query filter expression tree.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use super::registry::FilterRegistry;
use crate::backend::Predicate;
use crate::cache::compute_hash;

/// Dimension that field identifiers are stored under in the backend.
pub const DEFAULT_FIELD_DIMENSION: &str = "field";

/// Wire discriminator of each filter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Selector,
    In,
    FieldEquals,
    FieldIn,
    And,
    Or,
    Not,
    Raw,
}

impl FilterKind {
    pub const ALL: [FilterKind; 8] = [
        FilterKind::Selector,
        FilterKind::In,
        FilterKind::FieldEquals,
        FilterKind::FieldIn,
        FilterKind::And,
        FilterKind::Or,
        FilterKind::Not,
        FilterKind::Raw,
    ];

    /// The `type` tag used on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            FilterKind::Selector => "SELECTOR",
            FilterKind::In => "IN",
            FilterKind::FieldEquals => "FIELD",
            FilterKind::FieldIn => "FIELD_IN",
            FilterKind::And => "AND",
            FilterKind::Or => "OR",
            FilterKind::Not => "NOT",
            FilterKind::Raw => "SIMPLE",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Options controlling how filters compile to backend predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Backend dimension holding field identifiers.
    pub field_dimension: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            field_dimension: DEFAULT_FIELD_DIMENSION.to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_field_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.field_dimension = dimension.into();
        self
    }
}

/// A composable boolean filter over dimensional data.
///
/// Every variant must be handled in `compile_with()` and `to_json()` - the
/// compiler enforces this. Children are owned, so trees are acyclic by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    /// dimension == value
    Selector { dimension: String, value: String },

    /// dimension IN values
    In {
        dimension: String,
        values: BTreeSet<String>,
    },

    /// Matches a single metric/field identifier.
    FieldEquals { field_id: String },

    /// Matches any of a set of field identifiers.
    FieldIn { field_ids: BTreeSet<String> },

    /// Conjunction, compiled in child order.
    And { fields: Vec<QueryFilter> },

    /// Disjunction, compiled in child order.
    Or { fields: Vec<QueryFilter> },

    /// Negation of a single child.
    Not { field: Box<QueryFilter> },

    /// Escape hatch carrying a backend-native predicate.
    Raw { filter: Predicate },
}

impl QueryFilter {
    pub fn selector(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        QueryFilter::Selector {
            dimension: dimension.into(),
            value: value.into(),
        }
    }

    pub fn in_values<I, S>(dimension: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryFilter::In {
            dimension: dimension.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn field(field_id: impl Into<String>) -> Self {
        QueryFilter::FieldEquals {
            field_id: field_id.into(),
        }
    }

    pub fn field_in<I, S>(field_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryFilter::FieldIn {
            field_ids: field_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(fields: Vec<QueryFilter>) -> Self {
        QueryFilter::And { fields }
    }

    pub fn or(fields: Vec<QueryFilter>) -> Self {
        QueryFilter::Or { fields }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(field: QueryFilter) -> Self {
        QueryFilter::Not {
            field: Box::new(field),
        }
    }

    pub fn raw(filter: Predicate) -> Self {
        QueryFilter::Raw { filter }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            QueryFilter::Selector { .. } => FilterKind::Selector,
            QueryFilter::In { .. } => FilterKind::In,
            QueryFilter::FieldEquals { .. } => FilterKind::FieldEquals,
            QueryFilter::FieldIn { .. } => FilterKind::FieldIn,
            QueryFilter::And { .. } => FilterKind::And,
            QueryFilter::Or { .. } => FilterKind::Or,
            QueryFilter::Not { .. } => FilterKind::Not,
            QueryFilter::Raw { .. } => FilterKind::Raw,
        }
    }

    /// Structural validity.
    ///
    /// Leaves are valid when they name their dimension/field; `And`, `Or`
    /// and `Not` are valid when all their children are. An empty `And`/`Or`
    /// is valid. `Raw` cannot be inspected and is always valid.
    pub fn is_valid(&self) -> bool {
        match self {
            QueryFilter::Selector { dimension, .. } | QueryFilter::In { dimension, .. } => {
                !dimension.is_empty()
            }
            QueryFilter::FieldEquals { field_id } => !field_id.is_empty(),
            QueryFilter::FieldIn { field_ids } => field_ids.iter().all(|id| !id.is_empty()),
            QueryFilter::And { fields } | QueryFilter::Or { fields } => {
                fields.iter().all(QueryFilter::is_valid)
            }
            QueryFilter::Not { field } => field.is_valid(),
            QueryFilter::Raw { .. } => true,
        }
    }

    /// Compile to a backend predicate with default options.
    pub fn compile(&self) -> Predicate {
        self.compile_with(&CompileOptions::default())
    }

    /// Compile to a backend predicate.
    ///
    /// Output is deterministic: `And`/`Or` fold children in order starting
    /// from the empty predicate, and set-valued leaves compile in sorted
    /// order.
    pub fn compile_with(&self, options: &CompileOptions) -> Predicate {
        match self {
            QueryFilter::Selector { dimension, value } => Predicate::selector(dimension, value),
            QueryFilter::In { dimension, values } => Predicate::in_values(dimension, values),
            QueryFilter::FieldEquals { field_id } => {
                Predicate::selector(&options.field_dimension, field_id)
            }
            QueryFilter::FieldIn { field_ids } => {
                Predicate::in_values(&options.field_dimension, field_ids)
            }
            QueryFilter::And { fields } => fields
                .iter()
                .fold(Predicate::Empty, |acc, f| acc.and(f.compile_with(options))),
            QueryFilter::Or { fields } => fields
                .iter()
                .fold(Predicate::Empty, |acc, f| acc.or(f.compile_with(options))),
            QueryFilter::Not { field } => field.compile_with(options).not(),
            QueryFilter::Raw { filter } => filter.clone(),
        }
    }

    /// Encode in the wire format.
    pub fn to_json(&self) -> Value {
        let tag = self.kind().tag();
        match self {
            QueryFilter::Selector { dimension, value } => json!({
                "type": tag,
                "dimension": dimension,
                "value": value,
            }),
            QueryFilter::In { dimension, values } => json!({
                "type": tag,
                "dimension": dimension,
                "values": values,
            }),
            QueryFilter::FieldEquals { field_id } => json!({
                "type": tag,
                "fieldId": field_id,
            }),
            QueryFilter::FieldIn { field_ids } => json!({
                "type": tag,
                "fieldIds": field_ids,
            }),
            QueryFilter::And { fields } | QueryFilter::Or { fields } => json!({
                "type": tag,
                "fields": fields.iter().map(QueryFilter::to_json).collect::<Vec<_>>(),
            }),
            QueryFilter::Not { field } => json!({
                "type": tag,
                "field": field.to_json(),
            }),
            QueryFilter::Raw { filter } => json!({
                "type": tag,
                "filter": filter.to_native_json(),
            }),
        }
    }

    /// Data dimensions referenced anywhere in the tree.
    ///
    /// Field identifiers are not data dimensions and never appear here.
    pub fn referenced_dimensions(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.visit(&mut |node| {
            if let QueryFilter::Selector { dimension, .. } | QueryFilter::In { dimension, .. } =
                node
            {
                out.insert(dimension.as_str());
            }
        });
        out
    }

    /// Field identifiers referenced anywhere in the tree.
    pub fn field_ids(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.visit(&mut |node| match node {
            QueryFilter::FieldEquals { field_id } => {
                out.insert(field_id.as_str());
            }
            QueryFilter::FieldIn { field_ids } => {
                out.extend(field_ids.iter().map(String::as_str));
            }
            _ => {}
        });
        out
    }

    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            QueryFilter::And { fields } | QueryFilter::Or { fields } => {
                1 + fields.iter().map(QueryFilter::depth).max().unwrap_or(0)
            }
            QueryFilter::Not { field } => 1 + field.depth(),
            _ => 1,
        }
    }

    /// SHA-256 of the wire form; structurally equal filters share it.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        compute_hash(&self.to_json())
    }

    /// Pre-order traversal.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a QueryFilter)) {
        f(self);
        match self {
            QueryFilter::And { fields } | QueryFilter::Or { fields } => {
                for field in fields {
                    field.visit(f);
                }
            }
            QueryFilter::Not { field } => field.visit(f),
            _ => {}
        }
    }
}

impl Serialize for QueryFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FilterRegistry::standard()
            .deserialize(&value)
            .map_err(serde::de::Error::custom)?
            .ok_or_else(|| serde::de::Error::custom("empty filter object where a filter is required"))
    }
}

/// `deserialize_with` helper for optional filters that tolerates `{}`.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Request {
///     #[serde(default, deserialize_with = "prism::filter::deserialize_optional_filter")]
///     filter: Option<QueryFilter>,
/// }
/// ```
pub fn deserialize_optional_filter<'de, D>(deserializer: D) -> Result<Option<QueryFilter>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    FilterRegistry::standard()
        .deserialize(&value)
        .map_err(serde::de::Error::custom)
}
