use async_graphql_value::ConstValue;
use futures_util::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};

use super::{
    collect::{collect_fields, CollectedField},
    field::resolve_field,
};
use crate::{
    response::OrderedEntry, ContextSelectionSet, ResponseObject, ResponseValue, ServerError, ServerResult,
};

/// Resolve an container by executing each of the fields concurrently.
pub(crate) async fn resolve_root_container(ctx: ContextSelectionSet<'_>) -> ServerResult<ResponseObject> {
    resolve_container(ctx, true).await
}

/// Resolve an container by executing each of the fields serially.
pub(crate) async fn resolve_root_container_serial(ctx: ContextSelectionSet<'_>) -> ServerResult<ResponseObject> {
    resolve_container(ctx, false).await
}

/// Resolves every response key of the selection and assembles them in document order.
///
/// All fields run to completion before an error of a non-null field is propagated, so that
/// errors of sibling fields are recorded too.
pub(crate) fn resolve_container(ctx: ContextSelectionSet<'_>, parallel: bool) -> BoxFuture<'_, ServerResult<ResponseObject>> {
    async move {
        tracing::trace!("Where: {}", ctx.ty.name());

        let fields = collect_fields(&ctx)?;
        let mut results = Vec::with_capacity(fields.len());

        if parallel {
            let mut pending = fields
                .into_iter()
                .map(|field| {
                    let position = field.position.clone();
                    resolve_collected_field(&ctx, field).map(move |result| (position, result))
                })
                .collect::<FuturesUnordered<_>>();

            while let Some(result) = pending.next().await {
                results.push(result);
            }
            // Errors are reported in document order, not completion order.
            results.sort_by(|(a, _), (b, _)| a.cmp(b));
        } else {
            for field in fields {
                let position = field.position.clone();
                results.push((position, resolve_collected_field(&ctx, field).await));
            }
        }

        let mut entries = Vec::with_capacity(results.len());
        let mut first_error = None;

        for (_, result) in results {
            match result {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    } else {
                        ctx.query_env.add_error(error);
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(ResponseObject::from_ordered_entries(entries)),
        }
    }
    .boxed()
}

async fn resolve_collected_field<'a>(
    ctx: &ContextSelectionSet<'a>,
    collected: CollectedField<'a>,
) -> ServerResult<Option<OrderedEntry>> {
    let CollectedField { key, position, items } = collected;

    if items[0].node.name.node == "__typename" {
        return Ok(Some(OrderedEntry {
            position,
            key,
            value: ResponseValue::Primitive(ConstValue::String(ctx.ty.name().to_string())),
        }));
    }

    let field_name = items[0].node.name.node.as_str();
    let meta_field = ctx.ty.field_by_name(field_name).ok_or_else(|| {
        ServerError::new(
            format!(r#"Cannot query field "{field_name}" on type "{}"."#, ctx.ty.name()),
            Some(items[0].pos),
        )
        .with_path(ctx.path.child(key.clone()))
    })?;

    let ctx_field = ctx.with_field(meta_field, &key, position.clone(), items);
    let value = resolve_field(&ctx_field).await?;

    Ok(value.map(|value| OrderedEntry { position, key, value }))
}
