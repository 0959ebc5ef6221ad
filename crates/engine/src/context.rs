//! Execution state shared by the resolvers of one operation run.

use std::{
    collections::HashMap,
    ops::Deref,
    sync::{Arc, Mutex, PoisonError},
};

use async_graphql_parser::{
    types::{Directive, Field, SelectionSet},
    Positioned,
};
use async_graphql_value::{Name, Value};
use indexmap::IndexMap;

use crate::{
    prepare::PreparedOperation,
    registry::{Arguments, DirectiveContext, MetaField, MetaInputValue, MetaType, Registry, ResolvedValue},
    Data, PositionPath, QueryPath, ServerError,
};

pub struct SchemaEnvInner {
    pub registry: Registry,
    pub data: Data,
}

#[derive(Clone)]
pub struct SchemaEnv(Arc<SchemaEnvInner>);

impl SchemaEnv {
    pub(crate) fn new(registry: Registry, data: Data) -> Self {
        Self(Arc::new(SchemaEnvInner { registry, data }))
    }
}

impl Deref for SchemaEnv {
    type Target = SchemaEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// State of a single execution of an operation. Discarded once the response is built.
pub struct QueryEnvInner {
    pub operation: Arc<PreparedOperation>,
    pub root_value: ResolvedValue,
    errors: Mutex<Vec<ServerError>>,
    resolution_cache: Mutex<HashMap<QueryPath, ResolvedValue>>,
}

#[derive(Clone)]
pub struct QueryEnv(Arc<QueryEnvInner>);

impl Deref for QueryEnv {
    type Target = QueryEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl QueryEnv {
    pub(crate) fn new(operation: Arc<PreparedOperation>, root_value: ResolvedValue) -> Self {
        Self(Arc::new(QueryEnvInner {
            operation,
            root_value,
            errors: Mutex::default(),
            resolution_cache: Mutex::default(),
        }))
    }

    pub(crate) fn add_error(&self, error: ServerError) {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).push(error);
    }

    pub(crate) fn take_errors(&self) -> Vec<ServerError> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn cached_resolution(&self, path: &QueryPath) -> Option<ResolvedValue> {
        self.resolution_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub(crate) fn cache_resolution(&self, path: QueryPath, value: ResolvedValue) {
        self.resolution_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, value);
    }
}

/// Context for resolving the selection sets of one object.
///
/// Several selection sets are present when same-named fields were merged, their fields
/// are collected as if they were written one after the other.
#[derive(Clone)]
pub struct ContextSelectionSet<'a> {
    /// Concrete object type of the value.
    pub ty: &'a MetaType,
    pub path: QueryPath,
    pub position: PositionPath,
    pub selection_sets: Vec<&'a Positioned<SelectionSet>>,
    pub parent_value: ResolvedValue,
    pub schema_env: &'a SchemaEnv,
    pub query_env: &'a QueryEnv,
}

impl<'a> ContextSelectionSet<'a> {
    pub(crate) fn root(ty: &'a MetaType, schema_env: &'a SchemaEnv, query_env: &'a QueryEnv) -> Self {
        Self {
            ty,
            path: QueryPath::empty(),
            position: PositionPath::root(),
            selection_sets: vec![&query_env.operation.definition.node.selection_set],
            parent_value: query_env.root_value.clone(),
            schema_env,
            query_env,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        &self.schema_env.registry
    }

    pub(crate) fn with_field(
        &self,
        field: &'a MetaField,
        key: &Name,
        position: PositionPath,
        items: Vec<&'a Positioned<Field>>,
    ) -> ContextField<'a> {
        ContextField {
            parent_type: self.ty,
            field,
            items,
            path: self.path.child(key.clone()),
            position,
            parent_value: self.parent_value.clone(),
            schema_env: self.schema_env,
            query_env: self.query_env,
        }
    }

    /// Runs the pre-execution hook of custom directive handlers.
    pub(crate) fn include_before(&self, directives: &[Positioned<Directive>], path: &QueryPath) -> bool {
        directives.iter().all(|directive| {
            let name = directive.node.name.node.as_str();
            let Some(meta) = self.registry().directive(name) else {
                return true;
            };
            let Some(handler) = &meta.handler else {
                return true;
            };

            let args = coerce_arguments(&directive.node.arguments, &meta.args, &self.query_env.operation);
            handler.include_before(&DirectiveContext {
                name,
                args: &args,
                path,
            })
        })
    }
}

/// Context for resolving one response key of an object.
pub struct ContextField<'a> {
    pub parent_type: &'a MetaType,
    pub field: &'a MetaField,
    /// Field nodes merged under this response key, in document order.
    pub items: Vec<&'a Positioned<Field>>,
    pub path: QueryPath,
    pub position: PositionPath,
    pub parent_value: ResolvedValue,
    pub schema_env: &'a SchemaEnv,
    pub query_env: &'a QueryEnv,
}

impl<'a> ContextField<'a> {
    /// The first occurrence of the field in the document.
    pub fn item(&self) -> &'a Positioned<Field> {
        self.items[0]
    }

    pub fn registry(&self) -> &'a Registry {
        &self.schema_env.registry
    }

    pub(crate) fn arguments(&self) -> Arguments {
        coerce_arguments(&self.item().node.arguments, &self.field.args, &self.query_env.operation)
    }

    pub(crate) fn add_error(&self, error: ServerError) {
        self.query_env.add_error(error);
    }

    pub(crate) fn with_selection_set(
        &self,
        ty: &'a MetaType,
        path: QueryPath,
        value: ResolvedValue,
    ) -> ContextSelectionSet<'a> {
        ContextSelectionSet {
            ty,
            path,
            position: self.position.clone(),
            selection_sets: self.items.iter().map(|&item| &item.node.selection_set).collect(),
            parent_value: value,
            schema_env: self.schema_env,
            query_env: self.query_env,
        }
    }
}

/// Substitutes variables in the arguments written in the document and fills in default values
/// of absent arguments. Arguments without a definition are passed through.
pub(crate) fn coerce_arguments(
    arguments: &[(Positioned<Name>, Positioned<Value>)],
    definitions: &IndexMap<String, MetaInputValue>,
    operation: &PreparedOperation,
) -> Arguments {
    let mut coerced = IndexMap::with_capacity(definitions.len().max(arguments.len()));

    for (name, value) in arguments {
        coerced.insert(name.node.clone(), operation.resolve_value(value.node.clone()));
    }

    for definition in definitions.values() {
        if coerced.contains_key(definition.name.as_str()) {
            continue;
        }
        if let Some(default_value) = &definition.default_value {
            coerced.insert(Name::new(&definition.name), default_value.clone());
        }
    }

    Arguments::new(coerced)
}

impl std::fmt::Debug for QueryEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEnv")
            .field("operation", &self.operation.name)
            .finish_non_exhaustive()
    }
}
