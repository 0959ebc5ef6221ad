use std::{collections::HashMap, convert::Infallible};

use async_graphql_parser::{
    parse_query,
    types::{
        Directive, DocumentOperations, FragmentDefinition, OperationDefinition, OperationType, Selection, SelectionSet,
    },
    Positioned,
};
use async_graphql_value::{ConstValue, Name, Value};

use crate::{registry::Registry, Data, Request, StructuralError, Variables};

/// An operation checked against the schema, with its variables coerced. It can be executed
/// any number of times, which subscriptions do once per event.
#[derive(Debug)]
pub struct PreparedOperation {
    pub name: Option<String>,
    pub definition: Positioned<OperationDefinition>,
    pub fragments: HashMap<Name, Positioned<FragmentDefinition>>,
    pub variables: Variables,
    pub data: Data,
}

impl PreparedOperation {
    pub fn ty(&self) -> OperationType {
        self.definition.node.ty
    }

    /// Substitutes variables in a value from the document. Undefined variables become `null`.
    pub fn resolve_value(&self, value: Value) -> ConstValue {
        resolve_value(value, &self.variables)
    }
}

pub(crate) fn prepare(registry: &Registry, request: Request) -> Result<PreparedOperation, StructuralError> {
    let Request {
        query,
        operation_name,
        variables,
        data,
    } = request;

    let mut document = parse_query(&query)?;

    let (name, mut definition) = match operation_name {
        Some(operation_name) => match document.operations {
            DocumentOperations::Single(_) => None,
            DocumentOperations::Multiple(mut operations) => operations
                .remove(operation_name.as_str())
                .map(|operation| (Some(operation_name.clone()), operation)),
        }
        .ok_or(StructuralError::UnknownOperation(operation_name))?,
        None => match document.operations {
            DocumentOperations::Single(operation) => (None, operation),
            DocumentOperations::Multiple(operations) if operations.len() == 1 => operations
                .into_iter()
                .next()
                .map(|(name, operation)| (Some(name.to_string()), operation))
                .ok_or(StructuralError::OperationNameRequired)?,
            DocumentOperations::Multiple(_) => return Err(StructuralError::OperationNameRequired),
        },
    };

    check_fragment_spreads(&definition.node.selection_set.node, &document.fragments, &mut Vec::new())?;

    if registry.root_type(definition.node.ty).is_none() {
        return Err(StructuralError::OperationNotSupported(definition.node.ty));
    }

    let variables = coerce_variables(&definition, variables)?;

    for fragment in document.fragments.values_mut() {
        remove_skipped_selection(&mut fragment.node.selection_set.node, &variables);
    }
    remove_skipped_selection(&mut definition.node.selection_set.node, &variables);

    tracing::debug!(operation_name = ?name, "prepared operation");

    Ok(PreparedOperation {
        name,
        definition,
        fragments: document.fragments,
        variables,
        data,
    })
}

pub(crate) fn resolve_value(value: Value, variables: &Variables) -> ConstValue {
    value
        .into_const_with(|name| Ok::<_, Infallible>(variables.get(&name).cloned().unwrap_or_default()))
        .unwrap_or_else(|never| match never {})
}

fn check_fragment_spreads<'a>(
    selection_set: &'a SelectionSet,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    stack: &mut Vec<&'a str>,
) -> Result<(), StructuralError> {
    for selection in &selection_set.items {
        match &selection.node {
            Selection::Field(field) => check_fragment_spreads(&field.node.selection_set.node, fragments, stack)?,
            Selection::InlineFragment(fragment) => {
                check_fragment_spreads(&fragment.node.selection_set.node, fragments, stack)?;
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                let Some(fragment) = fragments.get(name) else {
                    return Err(StructuralError::UnknownFragment {
                        name: name.to_string(),
                        pos: spread.pos,
                    });
                };

                if stack.contains(&name) {
                    return Err(StructuralError::FragmentCycle {
                        name: name.to_string(),
                        pos: spread.pos,
                    });
                }

                stack.push(name);
                check_fragment_spreads(&fragment.node.selection_set.node, fragments, stack)?;
                stack.pop();
            }
        }
    }

    Ok(())
}

fn coerce_variables(
    definition: &Positioned<OperationDefinition>,
    mut provided: Variables,
) -> Result<Variables, StructuralError> {
    let mut variables = Variables::default();

    for variable in &definition.node.variable_definitions {
        let name = &variable.node.name.node;

        if let Some(value) = provided.remove(name) {
            variables.insert(name.clone(), value);
        } else if let Some(default_value) = &variable.node.default_value {
            variables.insert(name.clone(), default_value.node.clone());
        } else if !variable.node.var_type.node.nullable {
            return Err(StructuralError::MissingVariable {
                name: name.to_string(),
                ty: variable.node.var_type.node.to_string(),
                pos: variable.pos,
            });
        }
    }

    Ok(variables)
}

fn remove_skipped_selection(selection_set: &mut SelectionSet, variables: &Variables) {
    fn is_skipped(directives: &[Positioned<Directive>], variables: &Variables) -> bool {
        for directive in directives {
            let include = match directive.node.name.node.as_str() {
                "skip" => false,
                "include" => true,
                _ => continue,
            };

            if let Some(condition_input) = directive.node.get_argument("if") {
                let value = matches!(
                    resolve_value(condition_input.node.clone(), variables),
                    ConstValue::Boolean(true)
                );
                if include != value {
                    return true;
                }
            }
        }

        false
    }

    selection_set
        .items
        .retain(|selection| !is_skipped(selection.node.directives(), variables));

    for selection in &mut selection_set.items {
        selection
            .node
            .directives_mut()
            .retain(|directive| directive.node.name.node != "skip" && directive.node.name.node != "include");

        match &mut selection.node {
            Selection::Field(field) => remove_skipped_selection(&mut field.node.selection_set.node, variables),
            Selection::InlineFragment(fragment) => {
                remove_skipped_selection(&mut fragment.node.selection_set.node, variables);
            }
            Selection::FragmentSpread(_) => {}
        }
    }
}
