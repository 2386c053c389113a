use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::{StoreError, StoreResult};

/// A document-query predicate over JSON values.
///
/// Predicates are structured values, never strings assembled from caller
/// input. The selector form produced by [`Predicate::to_selector`] goes
/// through a JSON serializer, so a value such as `"}],"$or":[{"` stays a
/// plain string literal inside an equality condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Top-level field `field` is a JSON string equal to `value`.
    Eq { field: String, value: String },
    /// At least one sub-predicate matches.
    AnyOf(Vec<Predicate>),
    /// Every sub-predicate matches.
    AllOf(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn any_of(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::AnyOf(predicates.into_iter().collect())
    }

    pub fn all_of(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::AllOf(predicates.into_iter().collect())
    }

    /// Reject predicates a backend cannot evaluate meaningfully.
    pub fn validate(&self) -> StoreResult<()> {
        match self {
            Self::Eq { field, .. } => {
                if field.is_empty() {
                    return Err(StoreError::InvalidQuery("empty field name".into()));
                }
                Ok(())
            }
            Self::AnyOf(predicates) | Self::AllOf(predicates) => {
                if predicates.is_empty() {
                    return Err(StoreError::InvalidQuery(
                        "combinator with no conditions".into(),
                    ));
                }
                predicates.iter().try_for_each(Predicate::validate)
            }
        }
    }

    /// Evaluate against a JSON document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::Eq { field, value } => {
                document.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
            Self::AnyOf(predicates) => predicates.iter().any(|p| p.matches(document)),
            Self::AllOf(predicates) => predicates.iter().all(|p| p.matches(document)),
        }
    }

    /// CouchDB-style rich query document: `{"selector": {...}}`.
    pub fn to_selector(&self) -> Value {
        json!({ "selector": self.condition() })
    }

    fn condition(&self) -> Value {
        match self {
            Self::Eq { field, value } => {
                let mut map = Map::new();
                map.insert(field.clone(), Value::String(value.clone()));
                Value::Object(map)
            }
            Self::AnyOf(predicates) => {
                let conditions: Vec<Value> = predicates.iter().map(Predicate::condition).collect();
                json!({ "$or": conditions })
            }
            Self::AllOf(predicates) => {
                let conditions: Vec<Value> = predicates.iter().map(Predicate::condition).collect();
                json!({ "$and": conditions })
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_selector())
    }
}
