//! Backend-native predicates.
//!
//! `Predicate` is the filter tree the analytics engine understands. It is
//! what `QueryFilter::compile()` produces. Two renderings exist: the
//! engine's native JSON (Druid-style lower-case `type` tags) and a SQL
//! `WHERE` clause (see [`super::sql`]).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::error::{PredicateError, PredicateResult};

/// A backend-native filter predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Predicate {
    /// Identity element: matches everything and vanishes under `and`/`or`.
    #[default]
    Empty,

    /// dimension == value
    Selector { dimension: String, value: String },

    /// dimension IN (values...)
    In {
        dimension: String,
        values: Vec<String>,
    },

    /// Conjunction of all fields.
    And(Vec<Predicate>),

    /// Disjunction of all fields.
    Or(Vec<Predicate>),

    /// Negation.
    Not(Box<Predicate>),

    /// Engine filter the expression language does not model (bound, regex,
    /// javascript, ...). Carried through verbatim.
    Native(Value),
}

impl Predicate {
    /// dimension == value
    pub fn selector(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Selector {
            dimension: dimension.into(),
            value: value.into(),
        }
    }

    /// dimension IN (values...), keeping the iteration order of `values`.
    pub fn in_values<I, S>(dimension: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::In {
            dimension: dimension.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Predicate::Empty)
    }

    /// Logical AND. `Empty` is the identity; an existing `And` on the left
    /// is extended in place so folds stay flat and ordered.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Empty, p) | (p, Predicate::Empty) => p,
            (Predicate::And(mut fields), p) => {
                fields.push(p);
                Predicate::And(fields)
            }
            (p, q) => Predicate::And(vec![p, q]),
        }
    }

    /// Logical OR, with the same identity and flattening rules as [`and`](Self::and).
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Empty, p) | (p, Predicate::Empty) => p,
            (Predicate::Or(mut fields), p) => {
                fields.push(p);
                Predicate::Or(fields)
            }
            (p, q) => Predicate::Or(vec![p, q]),
        }
    }

    /// Logical NOT. Negating `Empty` yields `Empty`: negating "no filter"
    /// is still "no filter", so `Not(And([]))` matches everything.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        match self {
            Predicate::Empty => Predicate::Empty,
            p => Predicate::Not(Box::new(p)),
        }
    }

    /// Encode as the engine's native JSON. `Empty` becomes `null`.
    pub fn to_native_json(&self) -> Value {
        match self {
            Predicate::Empty => Value::Null,
            Predicate::Selector { dimension, value } => json!({
                "type": "selector",
                "dimension": dimension,
                "value": value,
            }),
            Predicate::In { dimension, values } => json!({
                "type": "in",
                "dimension": dimension,
                "values": values,
            }),
            Predicate::And(fields) => json!({
                "type": "and",
                "fields": fields.iter().map(Predicate::to_native_json).collect::<Vec<_>>(),
            }),
            Predicate::Or(fields) => json!({
                "type": "or",
                "fields": fields.iter().map(Predicate::to_native_json).collect::<Vec<_>>(),
            }),
            Predicate::Not(field) => json!({
                "type": "not",
                "field": field.to_native_json(),
            }),
            Predicate::Native(value) => value.clone(),
        }
    }

    /// Decode the engine's native JSON. Objects whose `type` is not one of
    /// the modelled kinds are kept as [`Predicate::Native`].
    pub fn from_native_json(value: &Value) -> PredicateResult<Predicate> {
        Predicate::from_native_json_within(value, usize::MAX, usize::MAX)
    }

    /// Like [`from_native_json`](Self::from_native_json), but rejects
    /// payloads nested deeper than `max_depth` levels (the top-level object
    /// is level 1) or with a list member longer than `max_width`.
    pub fn from_native_json_within(
        value: &Value,
        max_depth: usize,
        max_width: usize,
    ) -> PredicateResult<Predicate> {
        NativeDecoder {
            max_depth,
            max_width,
        }
        .decode(value, 1)
    }
}

struct NativeDecoder {
    max_depth: usize,
    max_width: usize,
}

impl NativeDecoder {
    fn decode(&self, value: &Value, depth: usize) -> PredicateResult<Predicate> {
        let obj = match value {
            Value::Null => return Ok(Predicate::Empty),
            Value::Object(obj) => obj,
            other => {
                return Err(PredicateError::NotAnObject {
                    found: json_kind(other),
                })
            }
        };
        if depth > self.max_depth {
            return Err(PredicateError::TooDeep {
                max: self.max_depth,
            });
        }

        let kind = match obj.get("type").and_then(Value::as_str) {
            Some(kind) => kind,
            None => return Ok(Predicate::Native(value.clone())),
        };

        match kind {
            "selector" => Ok(Predicate::Selector {
                dimension: required_str(obj, kind, "dimension")?,
                value: required_str(obj, kind, "value")?,
            }),
            "in" => Ok(Predicate::In {
                dimension: required_str(obj, kind, "dimension")?,
                values: required_str_array(self.array(obj, kind, "values")?, kind, "values")?,
            }),
            "and" => Ok(Predicate::And(self.fields(obj, kind, depth)?)),
            "or" => Ok(Predicate::Or(self.fields(obj, kind, depth)?)),
            "not" => {
                let field = obj.get("field").ok_or_else(|| missing(kind, "field"))?;
                Ok(Predicate::Not(Box::new(self.decode(field, depth + 1)?)))
            }
            _ => Ok(Predicate::Native(value.clone())),
        }
    }

    fn array<'a>(
        &self,
        obj: &'a Map<String, Value>,
        kind: &str,
        member: &str,
    ) -> PredicateResult<&'a [Value]> {
        let items = obj
            .get(member)
            .and_then(Value::as_array)
            .ok_or_else(|| missing(kind, member))?;
        if items.len() > self.max_width {
            return Err(PredicateError::TooWide {
                member: member.to_string(),
                len: items.len(),
                max: self.max_width,
            });
        }
        Ok(items)
    }

    fn fields(
        &self,
        obj: &Map<String, Value>,
        kind: &str,
        depth: usize,
    ) -> PredicateResult<Vec<Predicate>> {
        self.array(obj, kind, "fields")?
            .iter()
            .map(|field| self.decode(field, depth + 1))
            .collect()
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_native_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Predicate::from_native_json(&value).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn missing(kind: &str, member: &str) -> PredicateError {
    PredicateError::Malformed {
        kind: kind.to_string(),
        message: format!("missing '{}'", member),
    }
}

fn required_str(obj: &Map<String, Value>, kind: &str, member: &str) -> PredicateResult<String> {
    obj.get(member)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(kind, member))
}

fn required_str_array(items: &[Value], kind: &str, member: &str) -> PredicateResult<Vec<String>> {
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| PredicateError::Malformed {
                    kind: kind.to_string(),
                    message: format!("'{}' must contain only strings", member),
                })
        })
        .collect()
}
