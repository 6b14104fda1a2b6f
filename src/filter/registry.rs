//! Tag-dispatched decoding of filter trees.
//!
//! A [`FilterRegistry`] maps each wire `type` tag to a decoder. It is an
//! ordinary value: build one at startup (usually [`FilterRegistry::standard`])
//! and hand it to the code that decodes client input.
//!
//! ```ignore
//! let registry = FilterRegistry::standard().with_limits(settings.limits.into());
//! let filter = registry.deserialize(&payload)?; // Option<QueryFilter>
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use log::{debug, warn};
use serde_json::{Map, Value};

use super::error::{DeserializeError, DeserializeResult, RegistryError};
use super::node::{FilterKind, QueryFilter};
use crate::backend::predicate::json_kind;
use crate::backend::{Predicate, PredicateError};

const EXPECTED: &str = "QueryFilter";

/// Default maximum tree depth accepted from the wire.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default maximum number of entries in any list field.
pub const DEFAULT_MAX_WIDTH: usize = 1000;

/// Bounds on client-supplied trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializeLimits {
    pub max_depth: usize,
    pub max_width: usize,
}

impl Default for DeserializeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

/// Builds one filter node from its wire object.
pub type Decoder = fn(&NodeReader<'_>) -> DeserializeResult<QueryFilter>;

/// Something that may already be a filter, or may still be wire JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    Built(QueryFilter),
    Json(Value),
}

impl From<QueryFilter> for FilterInput {
    fn from(filter: QueryFilter) -> Self {
        FilterInput::Built(filter)
    }
}

impl From<Value> for FilterInput {
    fn from(value: Value) -> Self {
        FilterInput::Json(value)
    }
}

/// Registry of filter decoders keyed by wire tag.
#[derive(Clone)]
pub struct FilterRegistry {
    decoders: HashMap<String, Decoder>,
    limits: DeserializeLimits,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("tags", &self.tags())
            .field("limits", &self.limits)
            .finish()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FilterRegistry {
    /// An empty registry. Nothing decodes until tags are registered.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            limits: DeserializeLimits::default(),
        }
    }

    /// A registry with every built-in filter kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for kind in FilterKind::ALL {
            registry
                .decoders
                .insert(kind.tag().to_string(), standard_decoder(kind));
        }
        registry
    }

    pub fn with_limits(mut self, limits: DeserializeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> DeserializeLimits {
        self.limits
    }

    /// Register a decoder for `tag`. Registration is append-only.
    pub fn register(&mut self, tag: impl Into<String>, decoder: Decoder) -> Result<(), RegistryError> {
        let tag = tag.into();
        if self.decoders.contains_key(&tag) {
            return Err(RegistryError::DuplicateTag(tag));
        }
        self.decoders.insert(tag, decoder);
        Ok(())
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Decode a filter tree.
    ///
    /// `null` and `{}` decode to `None`: clients send an empty object for
    /// calculations that carry no filter.
    pub fn deserialize(&self, value: &Value) -> DeserializeResult<Option<QueryFilter>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(obj) if obj.is_empty() => {
                warn!("Treating empty filter object as no filter");
                Ok(None)
            }
            _ => self.decode_node(value, 1).map(Some),
        }
    }

    /// Decode a list of filter trees, applying [`deserialize`](Self::deserialize)
    /// to each element and keeping positions.
    pub fn deserialize_many(&self, value: &Value) -> DeserializeResult<Vec<Option<QueryFilter>>> {
        let items = value.as_array().ok_or(DeserializeError::NotAnObject {
            expected: "QueryFilter list",
            found: json_kind(value),
        })?;
        self.check_width("list", items.len())?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.deserialize(item)
                    .map_err(|e| DeserializeError::nested(format!("[{}]", i), e))
            })
            .collect()
    }

    /// Pass built filters through unchanged; decode JSON.
    pub fn resolve(&self, input: impl Into<FilterInput>) -> DeserializeResult<Option<QueryFilter>> {
        match input.into() {
            FilterInput::Built(filter) => Ok(Some(filter)),
            FilterInput::Json(value) => self.deserialize(&value),
        }
    }

    fn decode_node(&self, value: &Value, depth: usize) -> DeserializeResult<QueryFilter> {
        if depth > self.limits.max_depth {
            warn!(
                "Rejecting filter tree deeper than {}",
                self.limits.max_depth
            );
            return Err(DeserializeError::DepthExceeded {
                max: self.limits.max_depth,
            });
        }

        let obj = value.as_object().ok_or(DeserializeError::NotAnObject {
            expected: EXPECTED,
            found: json_kind(value),
        })?;

        let tag = match obj.get("type") {
            None => return Err(DeserializeError::MissingTag { expected: EXPECTED }),
            Some(Value::String(tag)) => tag.as_str(),
            Some(_) => {
                return Err(DeserializeError::InvalidField {
                    tag: EXPECTED.to_string(),
                    field: "type",
                    expected: "a string",
                })
            }
        };

        let decoder = self
            .decoders
            .get(tag)
            .ok_or_else(|| DeserializeError::UnknownTag {
                tag: tag.to_string(),
                expected: EXPECTED,
            })?;

        debug!("Decoding {} filter at depth {}", tag, depth);
        decoder(&NodeReader {
            registry: self,
            tag,
            obj,
            depth,
        })
    }

    fn check_width(&self, field: &str, len: usize) -> DeserializeResult<()> {
        if len > self.limits.max_width {
            warn!(
                "Rejecting '{}' with {} entries (limit {})",
                field, len, self.limits.max_width
            );
            return Err(DeserializeError::WidthExceeded {
                field: field.to_string(),
                len,
                max: self.limits.max_width,
            });
        }
        Ok(())
    }
}

/// Typed access to one wire object during decoding.
pub struct NodeReader<'a> {
    registry: &'a FilterRegistry,
    tag: &'a str,
    obj: &'a Map<String, Value>,
    depth: usize,
}

impl<'a> NodeReader<'a> {
    /// The tag this node was dispatched on.
    pub fn tag(&self) -> &str {
        self.tag
    }

    /// A required member, as raw JSON.
    pub fn value(&self, field: &'static str) -> DeserializeResult<&'a Value> {
        self.obj.get(field).ok_or_else(|| DeserializeError::MissingField {
            tag: self.tag.to_string(),
            field,
        })
    }

    /// A required string member.
    pub fn string(&self, field: &'static str) -> DeserializeResult<String> {
        self.value(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(field, "a string"))
    }

    /// A required list of strings, collected as a set.
    pub fn string_set(&self, field: &'static str) -> DeserializeResult<BTreeSet<String>> {
        let items = self
            .value(field)?
            .as_array()
            .ok_or_else(|| self.invalid(field, "a list of strings"))?;
        self.registry.check_width(field, items.len())?;

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(field, "a list of strings"))
            })
            .collect()
    }

    /// A required member holding an engine-native predicate. The payload
    /// shares this node's depth budget and the registry's width limit.
    pub fn native(&self, field: &'static str) -> DeserializeResult<Predicate> {
        let limits = self.registry.limits;
        let budget = limits.max_depth.saturating_sub(self.depth);
        Predicate::from_native_json_within(self.value(field)?, budget, limits.max_width).map_err(
            |e| {
                let source = match e {
                    PredicateError::TooDeep { .. } => {
                        warn!("Rejecting native filter deeper than {}", limits.max_depth);
                        DeserializeError::DepthExceeded {
                            max: limits.max_depth,
                        }
                    }
                    PredicateError::TooWide { member, len, max } => {
                        warn!("Rejecting native '{}' with {} entries (limit {})", member, len, max);
                        DeserializeError::WidthExceeded {
                            field: member,
                            len,
                            max,
                        }
                    }
                    other => other.into(),
                };
                DeserializeError::nested(field, source)
            },
        )
    }

    /// A required nested filter.
    pub fn child(&self, field: &'static str) -> DeserializeResult<QueryFilter> {
        let value = self.value(field)?;
        self.decode_child(value, field.to_string())
    }

    /// A required list of nested filters, in order.
    pub fn children(&self, field: &'static str) -> DeserializeResult<Vec<QueryFilter>> {
        let items = self
            .value(field)?
            .as_array()
            .ok_or_else(|| self.invalid(field, "a list of filters"))?;
        self.registry.check_width(field, items.len())?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.decode_child(item, format!("{}[{}]", field, i)))
            .collect()
    }

    fn decode_child(&self, value: &Value, path: String) -> DeserializeResult<QueryFilter> {
        if matches!(value, Value::Object(obj) if obj.is_empty()) {
            return Err(DeserializeError::EmptyNested { field: path });
        }
        self.registry
            .decode_node(value, self.depth + 1)
            .map_err(|e| DeserializeError::nested(path, e))
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> DeserializeError {
        DeserializeError::InvalidField {
            tag: self.tag.to_string(),
            field,
            expected,
        }
    }
}

fn standard_decoder(kind: FilterKind) -> Decoder {
    match kind {
        FilterKind::Selector => decode_selector,
        FilterKind::In => decode_in,
        FilterKind::FieldEquals => decode_field,
        FilterKind::FieldIn => decode_field_in,
        FilterKind::And => decode_and,
        FilterKind::Or => decode_or,
        FilterKind::Not => decode_not,
        FilterKind::Raw => decode_raw,
    }
}

pub fn decode_selector(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::Selector {
        dimension: node.string("dimension")?,
        value: node.string("value")?,
    })
}

pub fn decode_in(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::In {
        dimension: node.string("dimension")?,
        values: node.string_set("values")?,
    })
}

pub fn decode_field(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::FieldEquals {
        field_id: node.string("fieldId")?,
    })
}

pub fn decode_field_in(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::FieldIn {
        field_ids: node.string_set("fieldIds")?,
    })
}

pub fn decode_and(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::And {
        fields: node.children("fields")?,
    })
}

pub fn decode_or(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::Or {
        fields: node.children("fields")?,
    })
}

pub fn decode_not(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    Ok(QueryFilter::Not {
        field: Box::new(node.child("field")?),
    })
}

pub fn decode_raw(node: &NodeReader<'_>) -> DeserializeResult<QueryFilter> {
    let filter = node.native("filter")?;
    Ok(QueryFilter::Raw { filter })
}
