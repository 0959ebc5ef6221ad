use async_graphql_value::{ConstValue, Name};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};

use crate::{PositionPath, ServerError};

/// A completed value of the response tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseValue {
    #[default]
    Null,
    Primitive(ConstValue),
    List(Vec<ResponseValue>),
    Object(ResponseObject),
}

impl ResponseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ResponseValue::Null | ResponseValue::Primitive(ConstValue::Null))
    }

    pub fn as_object(&self) -> Option<&ResponseObject> {
        match self {
            ResponseValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn into_json(self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl Serialize for ResponseValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResponseValue::Null => serializer.serialize_unit(),
            ResponseValue::Primitive(value) => value.serialize(serializer),
            ResponseValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ResponseValue::Object(object) => object.serialize(serializer),
        }
    }
}

impl From<ConstValue> for ResponseValue {
    fn from(value: ConstValue) -> Self {
        match value {
            ConstValue::Null => ResponseValue::Null,
            ConstValue::List(items) => ResponseValue::List(items.into_iter().map(Into::into).collect()),
            ConstValue::Object(fields) => ResponseValue::Object(ResponseObject {
                entries: fields.into_iter().map(|(key, value)| (key, value.into())).collect(),
            }),
            value => ResponseValue::Primitive(value),
        }
    }
}

/// A field of an object being assembled, tagged with where its selection first appeared.
#[derive(Debug)]
pub(crate) struct OrderedEntry {
    pub position: PositionPath,
    pub key: Name,
    pub value: ResponseValue,
}

/// An object of the response: an association list in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseObject {
    entries: Vec<(Name, ResponseValue)>,
}

impl ResponseObject {
    /// Orders entries by their position path. Entries arrive in completion order.
    pub(crate) fn from_ordered_entries(mut entries: Vec<OrderedEntry>) -> Self {
        entries.sort_by(|a, b| a.position.cmp(&b.position));

        Self {
            entries: entries.into_iter().map(|entry| (entry.key, entry.value)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ResponseValue> {
        self.entries
            .iter()
            .find(|(name, _)| name.as_str() == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &ResponseValue)> + '_ {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResponseObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

/// The result of executing an operation.
///
/// `data` is absent when the document could not be executed at all, and `null` when a
/// non-null field failed all the way up to the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub data: Option<ResponseValue>,
    pub errors: Vec<ServerError>,
}

impl Response {
    pub fn new(data: ResponseValue) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<ServerError>) -> Self {
        Self { data: None, errors }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ServerError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = usize::from(self.data.is_some()) + usize::from(!self.errors.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(data) = &self.data {
            map.serialize_entry("data", data)?;
        }
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}
