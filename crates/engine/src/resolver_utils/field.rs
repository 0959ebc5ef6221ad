use async_graphql_value::{ConstValue, Name};
use futures_util::{future::BoxFuture, FutureExt};
use serde_json::Value;

use super::{container::resolve_container, list::complete_list};
use crate::{
    context::coerce_arguments,
    registry::{DirectiveContext, MetaType, ResolvedValue, ResolverContext, TypeRef},
    ContextField, QueryPath, ResponseValue, ServerError, ServerResult,
};

/// Resolves and completes a field.
///
/// `Ok(None)` means the field is left out of the response. A failure on a nullable field is
/// recorded and the field becomes `null`, a failure on a non-null field is returned to the
/// parent.
pub(crate) async fn resolve_field(ctx: &ContextField<'_>) -> ServerResult<Option<ResponseValue>> {
    let result = async {
        let value = run_resolver(ctx).await?;
        let completed = complete_value(ctx, ctx.field.ty.as_type_ref(), value, ctx.path.clone()).await?;

        match completed {
            Some(value) => apply_directives(ctx, value),
            None => Ok(None),
        }
    }
    .await;

    match result {
        Err(error) if ctx.field.ty.is_nullable() => {
            ctx.add_error(error);
            Ok(Some(ResponseValue::Null))
        }
        result => result,
    }
}

/// Runs the resolver once per response path within an execution.
async fn run_resolver(ctx: &ContextField<'_>) -> ServerResult<ResolvedValue> {
    if let Some(value) = ctx.query_env.cached_resolution(&ctx.path) {
        return Ok(value);
    }

    let args = ctx.arguments();
    let resolver_ctx = ResolverContext {
        parent: &ctx.parent_value,
        args: &args,
        field: ctx.field,
        path: &ctx.path,
        request_data: &ctx.query_env.operation.data,
        schema_data: &ctx.schema_env.data,
    };

    let value = ctx
        .field
        .resolver
        .resolve(resolver_ctx)
        .await
        .map_err(|error| error.into_server_error(ctx.item().pos).with_path(ctx.path.clone()))?;

    ctx.query_env.cache_resolution(ctx.path.clone(), value.clone());

    Ok(value)
}

/// Post-execution hooks of custom directives: value rewriting, then the include decision.
fn apply_directives(ctx: &ContextField<'_>, mut value: ResponseValue) -> ServerResult<Option<ResponseValue>> {
    let item = ctx.item();

    for directive in &item.node.directives {
        let name = directive.node.name.node.as_str();
        let Some(meta) = ctx.registry().directive(name) else {
            continue;
        };
        let Some(handler) = &meta.handler else {
            continue;
        };

        let args = coerce_arguments(&directive.node.arguments, &meta.args, &ctx.query_env.operation);
        let directive_ctx = DirectiveContext {
            name,
            args: &args,
            path: &ctx.path,
        };

        value = handler
            .resolve(&directive_ctx, value)
            .map_err(|error| error.into_server_error(directive.pos).with_path(ctx.path.clone()))?;

        if !handler.include_after(&directive_ctx, &value) {
            return Ok(None);
        }
    }

    Ok(Some(value))
}

/// Completes a resolved value against its declared type.
pub(super) fn complete_value<'a>(
    ctx: &'a ContextField<'_>,
    ty: TypeRef<'a>,
    value: ResolvedValue,
    path: QueryPath,
) -> BoxFuture<'a, ServerResult<Option<ResponseValue>>> {
    async move {
        if value.is_null() {
            if ty.is_non_null() {
                return Err(non_null_error(ctx, path));
            }
            return Ok(Some(ResponseValue::Null));
        }

        if let Some(item_ty) = ty.list_item() {
            return complete_list(ctx, item_ty, value, path).await.map(Some);
        }

        let named_type = ty.named_type();
        let meta_type = ctx.registry().resolve_type(named_type).ok_or_else(|| {
            ServerError::new(format!("Unknown type \"{named_type}\"."), Some(ctx.item().pos)).with_path(path.clone())
        })?;

        match meta_type {
            MetaType::Scalar(scalar) => complete_scalar(&scalar.name, value.data_resolved())
                .map(|value| Some(ResponseValue::Primitive(value)))
                .map_err(|message| ServerError::new(message, Some(ctx.item().pos)).with_path(path)),
            MetaType::Enum(enum_type) => match value.data_resolved() {
                Value::String(name) if enum_type.values.iter().any(|value| value == name) => {
                    Ok(Some(ResponseValue::Primitive(ConstValue::Enum(Name::new(name)))))
                }
                other => Err(ServerError::new(
                    format!("Enum \"{}\" cannot represent value {other}.", enum_type.name),
                    Some(ctx.item().pos),
                )
                .with_path(path)),
            },
            MetaType::Object(_) => {
                let object = resolve_container(ctx.with_selection_set(meta_type, path, value), true).await?;
                Ok(Some(ResponseValue::Object(object)))
            }
            MetaType::Interface(_) | MetaType::Union(_) => {
                let type_resolver = meta_type.type_resolver().cloned().unwrap_or_default();
                let Some(type_name) = type_resolver.resolve(value.data_resolved()) else {
                    tracing::debug!(path = %path, abstract_type = meta_type.name(), "no concrete type, omitting value");
                    return Ok(None);
                };

                let registry = ctx.registry();
                let concrete = match registry.resolve_type(&type_name) {
                    Some(concrete @ MetaType::Object(_))
                        if registry.type_condition_matches(meta_type.name(), concrete.name()) =>
                    {
                        concrete
                    }
                    _ => {
                        return Err(ServerError::new(
                            format!(
                                "Abstract type \"{}\" resolved to \"{type_name}\", which is not a possible type.",
                                meta_type.name()
                            ),
                            Some(ctx.item().pos),
                        )
                        .with_path(path))
                    }
                };

                let object = resolve_container(ctx.with_selection_set(concrete, path, value), true).await?;
                Ok(Some(ResponseValue::Object(object)))
            }
            MetaType::InputObject(_) => Err(ServerError::new(
                format!("Input type \"{named_type}\" cannot be used as an output type."),
                Some(ctx.item().pos),
            )
            .with_path(path)),
        }
    }
    .boxed()
}

pub(super) fn non_null_error(ctx: &ContextField<'_>, path: QueryPath) -> ServerError {
    ServerError::new(
        format!(
            "An error occurred while fetching `{}`, a non-nullable value was expected but no value was found.",
            ctx.item().node.name.node
        ),
        Some(ctx.item().pos),
    )
    .with_path(path)
}

fn complete_scalar(name: &str, value: &Value) -> Result<ConstValue, String> {
    let valid = match name {
        "Int" => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
        "Float" => value.is_number(),
        "String" => value.is_string(),
        "Boolean" => value.is_boolean(),
        "ID" => value.is_string() || value.is_i64() || value.is_u64(),
        _ => true,
    };

    if !valid {
        return Err(format!("{name} cannot represent value {value}."));
    }

    let value = match (name, value) {
        ("ID", Value::Number(number)) => Value::String(number.to_string()),
        _ => value.clone(),
    };

    ConstValue::from_json(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("Int", json!(42), Ok(json!(42)))]
    #[case("Int", json!(3.5), Err("Int cannot represent value 3.5.".to_string()))]
    #[case("Int", json!(4_000_000_000_i64), Err("Int cannot represent value 4000000000.".to_string()))]
    #[case("Float", json!(1), Ok(json!(1)))]
    #[case("String", json!("Luke"), Ok(json!("Luke")))]
    #[case("String", json!(true), Err("String cannot represent value true.".to_string()))]
    #[case("Boolean", json!(false), Ok(json!(false)))]
    #[case("ID", json!(1000), Ok(json!("1000")))]
    #[case("JSON", json!({ "any": ["thing"] }), Ok(json!({ "any": ["thing"] })))]
    fn scalar_completion(#[case] scalar: &str, #[case] value: Value, #[case] expected: Result<Value, String>) {
        let completed = complete_scalar(scalar, &value).map(|value| value.into_json().unwrap());
        assert_eq!(completed, expected);
    }
}
