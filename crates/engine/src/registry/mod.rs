//! Schema definition: named types, their fields and resolvers, and directive definitions.

mod directives;
mod field;
pub mod resolvers;
mod types;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_graphql_parser::types::OperationType;
use async_graphql_value::ConstValue;

pub use directives::{DirectiveContext, DirectiveHandler, DirectiveLocation, MetaDirective};
pub use field::{Deprecation, MetaField, MetaFieldType, MetaInputValue, SubscriptionSource, TypeRef};
pub use resolvers::{Arguments, ResolvedValue, Resolver, ResolverContext, ResolverFuture, TypeResolver};
pub use types::{EnumType, InputObjectType, InterfaceType, MetaType, ObjectType, ScalarType, UnionType};

use crate::RegistryError;

pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

#[derive(Debug, Clone)]
pub struct Registry {
    pub types: BTreeMap<String, MetaType>,
    pub directives: HashMap<String, MetaDirective>,
    /// Object type name to the interfaces it implements.
    pub implements: HashMap<String, HashSet<String>>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
}

impl Registry {
    /// Creates a registry with the built-in scalars and directives.
    pub fn new(query_type: impl Into<String>) -> Self {
        let mut registry = Registry {
            types: BTreeMap::new(),
            directives: HashMap::new(),
            implements: HashMap::new(),
            query_type: query_type.into(),
            mutation_type: None,
            subscription_type: None,
        };

        for scalar in BUILTIN_SCALARS {
            registry
                .types
                .insert(scalar.to_string(), ScalarType::new(scalar).into());
        }
        add_builtin_directives(&mut registry);

        registry
    }

    #[must_use]
    pub fn with_mutation_type(self, name: impl Into<String>) -> Self {
        Self {
            mutation_type: Some(name.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_subscription_type(self, name: impl Into<String>) -> Self {
        Self {
            subscription_type: Some(name.into()),
            ..self
        }
    }

    pub fn register(&mut self, ty: impl Into<MetaType>) -> Result<(), RegistryError> {
        let ty = ty.into();
        let name = ty.name().to_string();

        if self.types.contains_key(&name) {
            return Err(RegistryError::DuplicateType(name));
        }

        if let MetaType::Object(object) = &ty {
            if !object.implements.is_empty() {
                self.implements
                    .entry(name.clone())
                    .or_default()
                    .extend(object.implements.iter().cloned());
            }
        }

        self.types.insert(name, ty);
        Ok(())
    }

    /// Adds or replaces a directive definition.
    pub fn add_directive(&mut self, directive: MetaDirective) {
        self.directives.insert(directive.name.clone(), directive);
    }

    pub fn directive(&self, name: &str) -> Option<&MetaDirective> {
        self.directives.get(name)
    }

    pub fn resolve_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    pub fn lookup(&self, name: &str) -> Result<&MetaType, RegistryError> {
        self.resolve_type(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    pub fn resolve_field(&self, owner: &str, field: &str) -> Result<&MetaField, RegistryError> {
        self.lookup(owner)?
            .field_by_name(field)
            .ok_or_else(|| RegistryError::UnknownField {
                owner: owner.to_string(),
                field: field.to_string(),
            })
    }

    pub fn root_type(&self, operation_type: OperationType) -> Option<&MetaType> {
        let name = match operation_type {
            OperationType::Query => Some(self.query_type.as_str()),
            OperationType::Mutation => self.mutation_type.as_deref(),
            OperationType::Subscription => self.subscription_type.as_deref(),
        }?;

        self.resolve_type(name)
    }

    /// Concrete object types a value of `name` can have at runtime.
    pub fn possible_types(&self, name: &str) -> BTreeSet<&str> {
        match self.resolve_type(name) {
            Some(MetaType::Object(object)) => BTreeSet::from([object.name.as_str()]),
            Some(MetaType::Interface(interface)) => self
                .implements
                .iter()
                .filter(|(_, interfaces)| interfaces.contains(&interface.name))
                .map(|(object, _)| object.as_str())
                .collect(),
            Some(MetaType::Union(union)) => union.possible_types.iter().map(String::as_str).collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Whether a fragment with this type condition applies to an object of type `concrete`: the
    /// condition names the object itself, an interface it implements or a union containing it.
    pub fn type_condition_matches(&self, condition: &str, concrete: &str) -> bool {
        condition == concrete || self.possible_types(condition).contains(concrete)
    }
}

fn add_builtin_directives(registry: &mut Registry) {
    let conditional_locations = [
        DirectiveLocation::Field,
        DirectiveLocation::FragmentSpread,
        DirectiveLocation::InlineFragment,
    ];

    registry.add_directive(
        MetaDirective::new("include", conditional_locations)
            .with_description(
                "Directs the executor to include this field or fragment only when the `if` argument is true.",
            )
            .argument(MetaInputValue::new("if", "Boolean!").with_description("Included when true.")),
    );

    registry.add_directive(
        MetaDirective::new("skip", conditional_locations)
            .with_description("Directs the executor to skip this field or fragment when the `if` argument is true.")
            .argument(MetaInputValue::new("if", "Boolean!").with_description("Skipped when true.")),
    );

    registry.add_directive(
        MetaDirective::new(
            "deprecated",
            [DirectiveLocation::FieldDefinition, DirectiveLocation::EnumValue],
        )
        .with_description("Marks an element of a GraphQL schema as no longer supported.")
        .argument(MetaInputValue::new("reason", "String").with_default(ConstValue::String("No longer supported".to_string()))),
    );
}
