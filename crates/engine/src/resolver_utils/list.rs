use futures_util::future::join_all;

use super::field::complete_value;
use crate::{registry::{ResolvedValue, TypeRef}, ContextField, QueryPath, ResponseValue, ServerError, ServerResult};

/// Completes every item of a list concurrently, keeping the order of the resolved list.
///
/// An item failing against a nullable item type becomes `null`, one failing against a non-null
/// item type fails the whole list. Items without a concrete type are dropped.
pub(super) async fn complete_list(
    ctx: &ContextField<'_>,
    item_ty: TypeRef<'_>,
    value: ResolvedValue,
    path: QueryPath,
) -> ServerResult<ResponseValue> {
    let Some(items) = value.item_list() else {
        return Err(ServerError::new(
            format!("Encountered a {} where we expected a list", json_kind(value.data_resolved())),
            Some(ctx.item().pos),
        )
        .with_path(path));
    };

    let results = join_all(
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| complete_value(ctx, item_ty, item, path.child(index))),
    )
    .await;

    let mut list = Vec::with_capacity(results.len());
    let mut first_error = None;

    for result in results {
        match result {
            Ok(Some(item)) => list.push(item),
            Ok(None) => {}
            Err(error) if item_ty.is_nullable() => {
                ctx.add_error(error);
                list.push(ResponseValue::Null);
            }
            Err(error) => match first_error {
                None => first_error = Some(error),
                Some(_) => ctx.add_error(error),
            },
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(ResponseValue::List(list)),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}
