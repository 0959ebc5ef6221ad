use std::{fmt, sync::Arc};

use async_graphql_value::ConstValue;
use event_bus::Filter;
use indexmap::IndexMap;

use super::resolvers::{Arguments, Resolver, ResolverContext, ResolverFuture};
use crate::Error;

#[derive(Debug, Clone, Default)]
pub struct MetaField {
    pub name: String,
    pub description: Option<String>,
    pub args: IndexMap<String, MetaInputValue>,
    pub ty: MetaFieldType,
    pub deprecation: Deprecation,
    pub resolver: Resolver,
    pub subscription: Option<SubscriptionSource>,
}

impl MetaField {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaField {
        MetaField {
            name: name.into(),
            ty: ty.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }

    #[must_use]
    pub fn argument(mut self, argument: MetaInputValue) -> Self {
        self.args.insert(argument.name.clone(), argument);
        self
    }

    #[must_use]
    pub fn deprecated(self, reason: Option<&str>) -> Self {
        Self {
            deprecation: Deprecation::Deprecated {
                reason: reason.map(str::to_string),
            },
            ..self
        }
    }

    #[must_use]
    pub fn with_resolver(self, resolver: Resolver) -> Self {
        Self { resolver, ..self }
    }

    /// Sets an asynchronous resolver.
    #[must_use]
    pub fn resolve<F>(self, resolver: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> ResolverFuture<'a> + Send + Sync + 'static,
    {
        self.with_resolver(Resolver::new(resolver))
    }

    /// Sets a resolver that computes its value immediately.
    #[must_use]
    pub fn resolve_sync<F>(self, resolver: F) -> Self
    where
        F: Fn(ResolverContext<'_>) -> Result<serde_json::Value, Error> + Send + Sync + 'static,
    {
        self.with_resolver(Resolver::from_fn(resolver))
    }

    /// Binds a subscription root field to an event channel. Unless a resolver was set, the
    /// published payload becomes the field value.
    #[must_use]
    pub fn subscribe_to(mut self, source: SubscriptionSource) -> Self {
        if matches!(self.resolver, Resolver::Property) {
            self.resolver = Resolver::Parent;
        }
        self.subscription = Some(source);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Deprecation {
    #[default]
    NoDeprecated,
    Deprecated {
        reason: Option<String>,
    },
}

impl Deprecation {
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Deprecation::Deprecated { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Deprecation::NoDeprecated => None,
            Deprecation::Deprecated { reason } => reason.as_deref(),
        }
    }
}

/// Argument of a field or a directive, or a field of an input object.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaInputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: MetaFieldType,
    pub default_value: Option<ConstValue>,
}

impl MetaInputValue {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaInputValue {
        MetaInputValue {
            name: name.into(),
            description: None,
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_default(self, default_value: impl Into<ConstValue>) -> Self {
        Self {
            default_value: Some(default_value.into()),
            ..self
        }
    }
}

/// A GraphQL type reference in SDL notation, e.g. `[Character!]!`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MetaFieldType(String);

impl MetaFieldType {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_type_ref(&self) -> TypeRef<'_> {
        TypeRef(&self.0)
    }

    pub fn is_non_null(&self) -> bool {
        self.as_type_ref().is_non_null()
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_non_null()
    }

    pub fn named_type(&self) -> &str {
        self.as_type_ref().named_type()
    }
}

impl From<&str> for MetaFieldType {
    fn from(ty: &str) -> Self {
        MetaFieldType(ty.to_string())
    }
}

impl From<String> for MetaFieldType {
    fn from(ty: String) -> Self {
        MetaFieldType(ty)
    }
}

impl fmt::Display for MetaFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Borrowed view over a type reference, used while walking list wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef<'a>(&'a str);

impl<'a> TypeRef<'a> {
    pub fn is_non_null(self) -> bool {
        self.0.ends_with('!')
    }

    pub fn is_nullable(self) -> bool {
        !self.is_non_null()
    }

    /// The item type when this is a list, e.g. `Character!` for `[Character!]!`.
    pub fn list_item(self) -> Option<TypeRef<'a>> {
        let base = self.0.strip_suffix('!').unwrap_or(self.0);
        base.strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .map(TypeRef)
    }

    pub fn named_type(self) -> &'a str {
        self.0.trim_start_matches('[').trim_end_matches([']', '!'])
    }

    pub fn as_str(self) -> &'a str {
        self.0
    }
}

type FilterBuilder = dyn Fn(&Arguments) -> Filter + Send + Sync;

/// Channel a subscription root field listens on, and how its arguments become a filter over
/// the published payloads.
#[derive(Clone)]
pub struct SubscriptionSource {
    pub channel: String,
    filter: Arc<FilterBuilder>,
}

impl SubscriptionSource {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            filter: Arc::new(|_| Filter::All),
        }
    }

    #[must_use]
    pub fn with_filter(self, filter: impl Fn(&Arguments) -> Filter + Send + Sync + 'static) -> Self {
        Self {
            filter: Arc::new(filter),
            ..self
        }
    }

    pub fn filter(&self, arguments: &Arguments) -> Filter {
        (self.filter)(arguments)
    }
}

impl fmt::Debug for SubscriptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionSource")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
