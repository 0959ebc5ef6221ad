use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use engine::{ChannelSelector, ClientId, Request, Response, ResponseStream, Schema, ServerError};
use futures_util::StreamExt;

/// Receives the outcome of the operations of a connection.
#[async_trait::async_trait]
pub trait Observer: Send + Sync + 'static {
    /// A response was produced for the operation.
    async fn on_next(&self, id: &str, response: Response);

    /// The operation could not be started.
    async fn on_error(&self, id: &str, error: ServerError);

    /// The operation will not produce any further response.
    async fn on_completed(&self, id: &str);
}

type Operations = Arc<Mutex<HashMap<String, OperationHandle>>>;

/// The active operations of one connection, keyed by the id the client chose for them.
pub struct OperationManager<O> {
    schema: Schema,
    session_id: String,
    observer: Arc<O>,
    operations: Operations,
    disposed: AtomicBool,
}

struct OperationHandle {
    client_id: ClientId,
    disposed: Arc<AtomicBool>,
}

impl OperationHandle {
    fn dispose(self, schema: &Schema) {
        self.disposed.store(true, Ordering::Release);
        schema
            .event_bus()
            .unsubscribe(&self.client_id, ChannelSelector::All);
    }
}

impl<O: Observer> OperationManager<O> {
    pub fn new(schema: Schema, session_id: impl Into<String>, observer: O) -> Self {
        Self {
            schema,
            session_id: session_id.into(),
            observer: Arc::new(observer),
            operations: Arc::default(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Starts an operation, replacing any active operation with the same id.
    ///
    /// Every response of the operation is handed to the observer, followed by a completion
    /// once the operation ends by itself. Errors preventing the start go to `on_error`.
    pub async fn subscribe(&self, id: &str, request: Request) {
        if self.disposed.load(Ordering::Acquire) {
            tracing::debug!(operation_id = id, "ignoring operation on a disposed connection");
            return;
        }

        if self.unsubscribe(id) {
            tracing::debug!(operation_id = id, "replacing operation");
        }

        let client_id = ClientId::new(self.session_id.clone(), id);
        let stream = match self.schema.subscribe(request, client_id.clone()) {
            Ok(stream) => stream,
            Err(error) => {
                tracing::debug!(operation_id = id, %error, "operation rejected");
                self.observer.on_error(id, error.into()).await;
                return;
            }
        };

        let disposed = Arc::new(AtomicBool::new(false));
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.to_string(),
                OperationHandle {
                    client_id,
                    disposed: Arc::clone(&disposed),
                },
            );

        tokio::spawn(run_operation(
            id.to_string(),
            stream,
            Arc::clone(&self.observer),
            Arc::clone(&self.operations),
            disposed,
        ));
    }
}

impl<O> OperationManager<O> {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stops an operation. Returns `false` when no operation has this id.
    pub fn unsubscribe(&self, id: &str) -> bool {
        let handle = self
            .operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        match handle {
            Some(handle) => {
                handle.dispose(&self.schema);
                true
            }
            None => false,
        }
    }

    /// Stops every operation and releases all the subscriptions of the session.
    pub fn dispose_all(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let handles = std::mem::take(&mut *self.operations.lock().unwrap_or_else(PoisonError::into_inner));
        let count = handles.len();

        for handle in handles.into_values() {
            handle.dispose(&self.schema);
        }

        self.schema.event_bus().unsubscribe_session(&self.session_id);
        tracing::debug!(session_id = %self.session_id, count, "disposed operations");
    }

    pub fn active_operations(&self) -> usize {
        self.operations.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<O> Drop for OperationManager<O> {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

async fn run_operation<O: Observer>(
    id: String,
    mut stream: ResponseStream,
    observer: Arc<O>,
    operations: Operations,
    disposed: Arc<AtomicBool>,
) {
    while let Some(response) = stream.next().await {
        if disposed.load(Ordering::Acquire) {
            return;
        }
        observer.on_next(&id, response).await;
    }

    if let Entry::Occupied(entry) = operations
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(id.clone())
    {
        if Arc::ptr_eq(&entry.get().disposed, &disposed) {
            entry.remove();
        }
    }

    if !disposed.load(Ordering::Acquire) {
        observer.on_completed(&id).await;
    }
}
