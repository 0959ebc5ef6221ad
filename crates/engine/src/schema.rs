use std::{any::Any, ops::Deref, sync::Arc};

use async_graphql_parser::types::OperationType;
use event_bus::{ClientId, EventBus};
use futures_util::{
    future,
    stream::{self, BoxStream, StreamExt},
};
use serde_json::Value;

use crate::{
    context::{ContextSelectionSet, QueryEnv, SchemaEnv},
    prepare::{prepare, PreparedOperation},
    registry::{MetaDirective, MetaField, MetaType, Registry, ResolvedValue},
    resolver_utils::{resolve_root_container, resolve_root_container_serial},
    Data, RegistryError, Request, Response, ResponseValue, StructuralError,
};

/// Schema builder
pub struct SchemaBuilder {
    registry: Registry,
    data: Data,
    event_bus: Option<Arc<EventBus<PreparedOperation>>>,
}

impl SchemaBuilder {
    /// Add a global data that can be accessed in the `Schema`. You access it with
    /// `ResolverContext::data`.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Adds a directive definition, replacing any definition of the same name.
    #[must_use]
    pub fn directive(mut self, directive: MetaDirective) -> Self {
        self.registry.add_directive(directive);
        self
    }

    /// Shares an event bus with other schemas. A new one is created otherwise.
    #[must_use]
    pub fn event_bus(mut self, event_bus: Arc<EventBus<PreparedOperation>>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Build schema.
    pub fn finish(self) -> Schema {
        Schema(Arc::new(SchemaInner {
            env: SchemaEnv::new(self.registry, self.data),
            event_bus: self.event_bus.unwrap_or_default(),
        }))
    }
}

#[doc(hidden)]
pub struct SchemaInner {
    pub(crate) env: SchemaEnv,
    pub(crate) event_bus: Arc<EventBus<PreparedOperation>>,
}

/// GraphQL schema.
///
/// Cloning a schema is cheap, so it can be easily shared.
#[derive(Clone)]
pub struct Schema(Arc<SchemaInner>);

impl Deref for Schema {
    type Target = SchemaInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("query_type", &self.registry().query_type)
            .field("mutation_type", &self.registry().mutation_type)
            .field("subscription_type", &self.registry().subscription_type)
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

impl Schema {
    /// Create a schema builder over a registry.
    pub fn build(registry: Registry) -> SchemaBuilder {
        SchemaBuilder {
            registry,
            data: Data::default(),
            event_bus: None,
        }
    }

    pub fn new(registry: Registry) -> Schema {
        Self::build(registry).finish()
    }

    pub fn registry(&self) -> &Registry {
        &self.env.registry
    }

    pub fn event_bus(&self) -> &Arc<EventBus<PreparedOperation>> {
        &self.event_bus
    }

    pub fn root_type(&self, operation_type: OperationType) -> Option<&MetaType> {
        self.registry().root_type(operation_type)
    }

    pub fn resolve_field(&self, owner: &str, field: &str) -> Result<&MetaField, RegistryError> {
        self.registry().resolve_field(owner, field)
    }

    /// Parses the request and checks it against the schema without running anything.
    pub fn prepare(&self, request: impl Into<Request>) -> Result<PreparedOperation, StructuralError> {
        prepare(self.registry(), request.into())
    }

    /// Execute a GraphQL query or mutation.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        let operation = match self.prepare(request) {
            Ok(operation) => operation,
            Err(error) => return Response::from_errors(vec![error.into()]),
        };

        if operation.ty() == OperationType::Subscription {
            return Response::from_errors(vec![
                StructuralError::WrongEntryPoint(OperationType::Subscription).into()
            ]);
        }

        self.execute_prepared(Arc::new(operation), ResolvedValue::null()).await
    }

    /// Runs a prepared operation against `root_value`, the parent value of its root fields.
    /// Subscriptions run their stored operation this way with the event payload as root value.
    pub async fn execute_prepared(&self, operation: Arc<PreparedOperation>, root_value: ResolvedValue) -> Response {
        let operation_type = operation.ty();
        let Some(root) = self.root_type(operation_type) else {
            return Response::from_errors(vec![StructuralError::OperationNotSupported(operation_type).into()]);
        };

        tracing::debug!(operation_name = ?operation.name, "executing operation");

        let query_env = QueryEnv::new(operation, root_value);
        let ctx = ContextSelectionSet::root(root, &self.env, &query_env);

        let result = match operation_type {
            OperationType::Mutation => resolve_root_container_serial(ctx).await,
            OperationType::Query | OperationType::Subscription => resolve_root_container(ctx).await,
        };

        match result {
            Ok(object) => Response::new(ResponseValue::Object(object)).with_errors(query_env.take_errors()),
            Err(error) => {
                let mut errors = vec![error];
                errors.extend(query_env.take_errors());
                Response::new(ResponseValue::Null).with_errors(errors)
            }
        }
    }

    /// Execute a GraphQL streaming request.
    ///
    /// Queries and mutations yield a single response, subscriptions one response per matching
    /// event until the stream is dropped.
    pub fn execute_stream(&self, request: impl Into<Request>) -> BoxStream<'static, Response> {
        let client_id = ClientId::new(ulid::Ulid::new().to_string(), "stream");

        match self.subscribe(request, client_id) {
            Ok(stream) => stream,
            Err(error) => stream::once(future::ready(Response::from_errors(vec![error.into()]))).boxed(),
        }
    }

    /// Publishes a payload on a channel, returning how many subscriptions it was delivered to.
    pub fn publish(&self, channel: &str, payload: Value) -> usize {
        self.event_bus.publish(payload, channel)
    }
}
