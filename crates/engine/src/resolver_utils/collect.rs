use std::collections::HashMap;

use async_graphql_parser::{
    types::{Field, Selection, SelectionSet},
    Positioned,
};
use async_graphql_value::Name;

use crate::{ContextSelectionSet, PositionPath, ServerError, ServerResult, StructuralError};

/// All the field nodes selected under one response key.
pub(crate) struct CollectedField<'a> {
    pub key: Name,
    /// Position of the first occurrence of the key.
    pub position: PositionPath,
    pub items: Vec<&'a Positioned<Field>>,
}

/// Response keys of a selection, in first occurrence order.
#[derive(Default)]
pub(crate) struct CollectedFields<'a> {
    fields: Vec<CollectedField<'a>>,
    index: HashMap<Name, usize>,
}

impl<'a> CollectedFields<'a> {
    fn add(&mut self, position: PositionPath, field: &'a Positioned<Field>) {
        let key = field.node.response_key().node.clone();

        match self.index.get(&key) {
            Some(&existing) => self.fields[existing].items.push(field),
            None => {
                self.index.insert(key.clone(), self.fields.len());
                self.fields.push(CollectedField {
                    key,
                    position,
                    items: vec![field],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl<'a> IntoIterator for CollectedFields<'a> {
    type Item = CollectedField<'a>;
    type IntoIter = std::vec::IntoIter<CollectedField<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Walks the selection sets of `ctx` against its runtime type: spreads are inlined, fragments
/// whose type condition does not apply are dropped and same-key fields are merged.
pub(crate) fn collect_fields<'a>(ctx: &ContextSelectionSet<'a>) -> ServerResult<CollectedFields<'a>> {
    let mut fields = CollectedFields::default();

    for (index, selection_set) in ctx.selection_sets.iter().enumerate() {
        collect_selection_set(ctx, selection_set, ctx.position.child(index), &mut fields)?;
    }

    Ok(fields)
}

fn collect_selection_set<'a>(
    ctx: &ContextSelectionSet<'a>,
    selection_set: &'a Positioned<SelectionSet>,
    position: PositionPath,
    fields: &mut CollectedFields<'a>,
) -> ServerResult<()> {
    for (ordinal, selection) in selection_set.node.items.iter().enumerate() {
        let position = position.child(ordinal);

        match &selection.node {
            Selection::Field(field) => {
                let path = ctx.path.child(field.node.response_key().node.clone());
                if ctx.include_before(&field.node.directives, &path) {
                    fields.add(position, field);
                }
            }
            Selection::FragmentSpread(spread) => {
                if !ctx.include_before(&spread.node.directives, &ctx.path) {
                    continue;
                }

                let name = spread.node.fragment_name.node.as_str();
                let fragment = ctx.query_env.operation.fragments.get(name).ok_or_else(|| {
                    ServerError::from(StructuralError::UnknownFragment {
                        name: name.to_string(),
                        pos: spread.pos,
                    })
                })?;

                if !ctx.include_before(&fragment.node.directives, &ctx.path) {
                    continue;
                }

                let condition = fragment.node.type_condition.node.on.node.as_str();
                if ctx.registry().type_condition_matches(condition, ctx.ty.name()) {
                    collect_selection_set(ctx, &fragment.node.selection_set, position, fields)?;
                }
            }
            Selection::InlineFragment(fragment) => {
                if !ctx.include_before(&fragment.node.directives, &ctx.path) {
                    continue;
                }

                let applies = match &fragment.node.type_condition {
                    Some(condition) => ctx
                        .registry()
                        .type_condition_matches(condition.node.on.node.as_str(), ctx.ty.name()),
                    None => true,
                };

                if applies {
                    collect_selection_set(ctx, &fragment.node.selection_set, position, fields)?;
                }
            }
        }
    }

    Ok(())
}
