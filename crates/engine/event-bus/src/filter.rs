use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate evaluated against an event payload before a subscriber is notified.
///
/// Paths are dotted (`character.appearsIn`), numeric segments index into arrays.
/// Two filters are the same interest when they are structurally equal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Eq {
        path: String,
        value: Value,
    },
    Contains {
        path: String,
        value: Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("path `{0}` does not exist in the payload")]
    MissingPath(String),
    #[error("value at `{0}` is neither a list nor a string")]
    NotAContainer(String),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn contains(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Contains {
            path: path.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            filter => Filter::And(vec![filter, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Evaluates the filter. An error means the payload does not have the shape the filter expects,
    /// callers treat it as a non-match.
    ///
    /// A branch of `or` that cannot be evaluated is a false branch. The negation of a comparison
    /// on a missing path holds: an absent value is not equal to anything.
    pub fn evaluate(&self, payload: &Value) -> Result<bool, FilterError> {
        match self {
            Filter::All => Ok(true),
            Filter::Eq { path, value } => Ok(lookup(payload, path)? == value),
            Filter::Contains { path, value } => match lookup(payload, path)? {
                Value::Array(items) => Ok(items.contains(value)),
                Value::String(haystack) => Ok(value.as_str().is_some_and(|needle| haystack.contains(needle))),
                _ => Err(FilterError::NotAContainer(path.clone())),
            },
            Filter::And(filters) => {
                for filter in filters {
                    if !filter.evaluate(payload)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(filters) => {
                for filter in filters {
                    match filter.evaluate(payload) {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(error) => tracing::trace!(%error, "or branch does not apply"),
                    }
                }
                Ok(false)
            }
            Filter::Not(filter) => match filter.evaluate(payload) {
                Ok(matched) => Ok(!matched),
                Err(FilterError::MissingPath(_)) => Ok(true),
                Err(error) => Err(error),
            },
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

fn lookup<'a>(payload: &'a Value, path: &str) -> Result<&'a Value, FilterError> {
    if path.is_empty() {
        return Ok(payload);
    }

    path.split('.')
        .try_fold(payload, |current, segment| {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
                _ => None,
            };
            next.ok_or(())
        })
        .map_err(|()| FilterError::MissingPath(path.to_string()))
}
