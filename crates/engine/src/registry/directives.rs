use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use super::{resolvers::Arguments, MetaInputValue};
use crate::{Error, QueryPath, ResponseValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    FieldDefinition,
    EnumValue,
}

#[derive(Clone)]
pub struct MetaDirective {
    pub name: String,
    pub description: Option<String>,
    pub locations: Vec<DirectiveLocation>,
    pub args: IndexMap<String, MetaInputValue>,
    pub is_repeatable: bool,
    pub handler: Option<Arc<dyn DirectiveHandler>>,
}

impl MetaDirective {
    pub fn new(name: impl Into<String>, locations: impl IntoIterator<Item = DirectiveLocation>) -> Self {
        Self {
            name: name.into(),
            description: None,
            locations: locations.into_iter().collect(),
            args: IndexMap::new(),
            is_repeatable: false,
            handler: None,
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
    pub fn with_handler(self, handler: impl DirectiveHandler + 'static) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            ..self
        }
    }
}

impl fmt::Debug for MetaDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaDirective")
            .field("name", &self.name)
            .field("locations", &self.locations)
            .field("args", &self.args)
            .field("is_repeatable", &self.is_repeatable)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Directive applied to a selection, as seen by its handler.
pub struct DirectiveContext<'a> {
    pub name: &'a str,
    pub args: &'a Arguments,
    /// Path of the field the directive is attached to, or of the enclosing object for
    /// fragments.
    pub path: &'a QueryPath,
}

/// Behavior of a custom executable directive.
///
/// `include_before` runs while fields are collected, `include_after` and `resolve` run once
/// the field has a value. Handlers are looked up by directive name in the registry.
pub trait DirectiveHandler: Send + Sync {
    fn include_before(&self, _ctx: &DirectiveContext<'_>) -> bool {
        true
    }

    fn include_after(&self, _ctx: &DirectiveContext<'_>, _value: &ResponseValue) -> bool {
        true
    }

    fn resolve(&self, _ctx: &DirectiveContext<'_>, value: ResponseValue) -> Result<ResponseValue, Error> {
        Ok(value)
    }
}
