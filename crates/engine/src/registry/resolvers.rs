use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use async_graphql_value::{ConstValue, Name};
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::MetaField;
use crate::{Data, Error, QueryPath};

/// Value produced by a resolver, shared with the resolvers of nested fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedValue(Arc<Value>);

impl ResolvedValue {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn data_resolved(&self) -> &Value {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// The value of `name` when this is an object, `null` otherwise.
    pub fn get_field(&self, name: &str) -> ResolvedValue {
        self.0.get(name).cloned().map(Self::new).unwrap_or_default()
    }

    pub fn item_list(&self) -> Option<Vec<ResolvedValue>> {
        self.0
            .as_array()
            .map(|items| items.iter().cloned().map(Self::new).collect())
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<Arc<Value>> for ResolvedValue {
    fn from(value: Arc<Value>) -> Self {
        Self(value)
    }
}

/// Coerced argument values of a field: variables substituted and defaults applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(IndexMap<Name, ConstValue>);

impl Arguments {
    pub(crate) fn new(arguments: IndexMap<Name, ConstValue>) -> Self {
        Self(arguments)
    }

    pub fn get(&self, name: &str) -> Option<&ConstValue> {
        self.0.get(name)
    }

    /// Deserializes an argument. A missing argument and an explicit `null` both give `None`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, Error> {
        match self.0.get(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(value) => {
                let json = value.clone().into_json()?;
                Ok(Some(serde_json::from_value(json)?))
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &ConstValue)> + '_ {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a custom resolver sees.
pub struct ResolverContext<'a> {
    pub parent: &'a ResolvedValue,
    pub args: &'a Arguments,
    pub field: &'a MetaField,
    pub path: &'a QueryPath,
    pub(crate) request_data: &'a Data,
    pub(crate) schema_data: &'a Data,
}

impl<'a> ResolverContext<'a> {
    pub fn parent_value(&self) -> &'a Value {
        self.parent.data_resolved()
    }

    /// Request data takes precedence over schema data of the same type.
    pub fn data<D: std::any::Any + Send + Sync>(&self) -> Option<&'a D> {
        self.request_data.get::<D>().or_else(|| self.schema_data.get::<D>())
    }

    pub fn data_or_err<D: std::any::Any + Send + Sync>(&self) -> Result<&'a D, Error> {
        self.data::<D>()
            .ok_or_else(|| Error::new(format!("Data `{}` does not exist.", std::any::type_name::<D>())))
    }
}

/// Boxed future returned by custom resolvers.
pub struct ResolverFuture<'a>(BoxFuture<'a, Result<Value, Error>>);

impl<'a> ResolverFuture<'a> {
    pub fn new(future: impl Future<Output = Result<Value, Error>> + Send + 'a) -> Self {
        Self(Box::pin(future))
    }

    pub fn ready(result: Result<Value, Error>) -> Self {
        Self::new(std::future::ready(result))
    }
}

impl Future for ResolverFuture<'_> {
    type Output = Result<Value, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

type ResolverFn = dyn for<'a> Fn(ResolverContext<'a>) -> ResolverFuture<'a> + Send + Sync;

/// How a field obtains its value from its parent.
#[derive(Clone, Default)]
pub enum Resolver {
    /// Reads the key named like the field from the parent object.
    #[default]
    Property,
    /// Uses the parent value itself.
    Parent,
    Custom(Arc<ResolverFn>),
}

impl Resolver {
    pub fn new<F>(resolver: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> ResolverFuture<'a> + Send + Sync + 'static,
    {
        Resolver::Custom(Arc::new(resolver))
    }

    pub fn from_fn<F>(resolver: F) -> Self
    where
        F: Fn(ResolverContext<'_>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self::new(move |ctx| ResolverFuture::ready(resolver(ctx)))
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Resolver::Parent)
    }

    pub(crate) async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<ResolvedValue, Error> {
        match self {
            Resolver::Property => Ok(ctx.parent.get_field(&ctx.field.name)),
            Resolver::Parent => Ok(ctx.parent.clone()),
            Resolver::Custom(resolver) => resolver(ctx).await.map(ResolvedValue::new),
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Property => f.write_str("Property"),
            Resolver::Parent => f.write_str("Parent"),
            Resolver::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Maps a runtime value of an interface or union to the name of its concrete object type.
/// `None` omits the value from the response.
#[derive(Clone)]
pub struct TypeResolver(Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>);

impl TypeResolver {
    pub fn new(resolver: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(resolver))
    }

    pub fn resolve(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new(|value| value.get("__typename").and_then(Value::as_str).map(str::to_string))
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver")
    }
}
