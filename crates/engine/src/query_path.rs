use std::fmt::{self, Write};

use async_graphql_value::Name;
use serde::{ser::SerializeSeq, Serialize, Serializer};

/// A segment of a response path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryPathSegment {
    Index(usize),
    Field(Name),
}

impl Serialize for QueryPathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryPathSegment::Index(index) => serializer.serialize_u64(*index as u64),
            QueryPathSegment::Field(name) => serializer.serialize_str(name),
        }
    }
}

/// Location of a value in the response, from the root. It doubles as the identity of a field
/// resolution within one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryPath(Vec<QueryPathSegment>);

impl QueryPath {
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(&self, segment: impl Into<QueryPathSegment>) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment.into());
        Self(segments)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryPathSegment> + '_ {
        self.0.iter()
    }
}

impl From<usize> for QueryPathSegment {
    fn from(index: usize) -> Self {
        QueryPathSegment::Index(index)
    }
}

impl From<Name> for QueryPathSegment {
    fn from(name: Name) -> Self {
        QueryPathSegment::Field(name)
    }
}

impl From<&str> for QueryPathSegment {
    fn from(name: &str) -> Self {
        QueryPathSegment::Field(Name::new(name))
    }
}

impl Serialize for QueryPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for segment in &self.0 {
            seq.serialize_element(segment)?;
        }
        seq.end()
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_char('.')?;
            }
            match segment {
                QueryPathSegment::Index(index) => write!(f, "{index}")?,
                QueryPathSegment::Field(name) => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

/// Ordinal indices of the selections leading from the operation root to a field.
///
/// The derived ordering is lexicographic with a prefix sorting before its extensions, which
/// is the order fields first appear in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionPath(Vec<u32>);

impl PositionPath {
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(&self, ordinal: usize) -> Self {
        let mut ordinals = Vec::with_capacity(self.0.len() + 1);
        ordinals.extend_from_slice(&self.0);
        ordinals.push(ordinal as u32);
        Self(ordinals)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}
