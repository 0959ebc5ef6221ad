use std::sync::Arc;

use async_graphql_parser::{
    types::{OperationType, Selection},
    Positioned,
};
use event_bus::{ClientId, EventBus, EventSubscription, Filter, SubscriptionId};
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

use crate::{
    context::coerce_arguments,
    prepare::PreparedOperation,
    registry::{ResolvedValue, SubscriptionSource},
    RegistryError, Response, Schema, StructuralError,
};

/// Responses of a subscription, one per matching event. Dropping the stream removes the
/// registration from the event bus.
pub type ResponseStream = BoxStream<'static, Response>;

impl Schema {
    /// Subscribes `client_id` to the events the operation listens to.
    ///
    /// Queries and mutations are executed once and yield a single response. Structural errors
    /// are returned before anything is registered.
    pub fn subscribe(&self, request: impl Into<crate::Request>, client_id: ClientId) -> Result<ResponseStream, StructuralError> {
        let operation = Arc::new(self.prepare(request)?);

        if operation.ty() != OperationType::Subscription {
            let schema = self.clone();
            return Ok(stream::once(async move { schema.execute_prepared(operation, ResolvedValue::null()).await }).boxed());
        }

        let (source, filter) = self.subscription_source(&operation)?;
        let (sender, receiver) = mpsc::unbounded_channel();

        tracing::debug!(%client_id, channel = %source.channel, %filter, "subscribing");

        let id = self.event_bus.subscribe(EventSubscription::new(
            client_id,
            source.channel.clone(),
            filter,
            operation,
            sender,
        ));

        let guard = RegistrationGuard {
            event_bus: Arc::clone(&self.event_bus),
            id,
        };

        let schema = self.clone();
        let stream = stream::unfold((receiver, guard), move |(mut receiver, guard)| {
            let schema = schema.clone();
            async move {
                let notification = receiver.recv().await?;
                let response = schema
                    .execute_prepared(notification.operation, ResolvedValue::from(notification.payload))
                    .await;
                Some((response, (receiver, guard)))
            }
        });

        Ok(stream.boxed())
    }

    /// The event channel of the single root field of a subscription, and the filter its
    /// arguments build.
    fn subscription_source(&self, operation: &PreparedOperation) -> Result<(SubscriptionSource, Filter), StructuralError> {
        let field = match operation.definition.node.selection_set.node.items.as_slice() {
            [Positioned {
                node: Selection::Field(field),
                ..
            }] => field,
            _ => return Err(StructuralError::InvalidSubscriptionRoot),
        };

        let root = self
            .root_type(OperationType::Subscription)
            .ok_or(StructuralError::OperationNotSupported(OperationType::Subscription))?;

        let name = field.node.name.node.as_str();
        let meta_field = root.field_by_name(name).ok_or_else(|| RegistryError::UnknownField {
            owner: root.name().to_string(),
            field: name.to_string(),
        })?;

        let source = meta_field
            .subscription
            .clone()
            .ok_or_else(|| StructuralError::NotSubscribable {
                name: name.to_string(),
                pos: field.pos,
            })?;

        let arguments = coerce_arguments(&field.node.arguments, &meta_field.args, operation);
        let filter = source.filter(&arguments);

        Ok((source, filter))
    }
}

/// Removes the registration a subscription stream was created with.
///
/// The registration id is unique, so a replacement registered for the same client is left alone.
struct RegistrationGuard {
    event_bus: Arc<EventBus<PreparedOperation>>,
    id: Option<SubscriptionId>,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            if self.event_bus.remove(id) {
                tracing::debug!(?id, "subscription stream dropped");
            }
        }
    }
}
