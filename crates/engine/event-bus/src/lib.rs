//! In-process publish/subscribe register driving GraphQL subscriptions.
//!
//! Subscribers register a filtered interest in a named channel. Publishing a payload
//! evaluates every filter on that channel and sends a [`Notification`] to each match
//! through the subscriber's own unbounded queue, so one slow consumer never holds up
//! the others.

mod filter;
mod subscription;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use serde_json::Value;

pub use filter::{Filter, FilterError};
pub use subscription::{ChannelSelector, ClientId, EventSubscription, Notification, SubscriptionId};

pub struct EventBus<Op> {
    channels: RwLock<HashMap<String, Vec<Registration<Op>>>>,
    next_id: AtomicU64,
}

struct Registration<Op> {
    id: SubscriptionId,
    subscription: Arc<EventSubscription<Op>>,
}

impl<Op> Clone for Registration<Op> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            subscription: Arc::clone(&self.subscription),
        }
    }
}

impl<Op> Default for EventBus<Op> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Op> EventBus<Op> {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers the subscription. Returns `None` when an equivalent one (same client, channel and
    /// filter) already exists, in which case nothing changes.
    pub fn subscribe(&self, subscription: EventSubscription<Op>) -> Option<SubscriptionId> {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let registrations = channels.entry(subscription.channel.clone()).or_default();

        if registrations
            .iter()
            .any(|registration| registration.subscription.is_equivalent(&subscription))
        {
            tracing::debug!(client_id = %subscription.client_id, channel = %subscription.channel, "ignoring duplicate subscription");
            return None;
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(client_id = %subscription.client_id, channel = %subscription.channel, filter = %subscription.filter, "subscribed");

        registrations.push(Registration {
            id,
            subscription: Arc::new(subscription),
        });

        Some(id)
    }

    /// Removes the subscriptions of `client_id` on the selected channels and returns how many were removed.
    pub fn unsubscribe(&self, client_id: &ClientId, selector: ChannelSelector) -> usize {
        self.retain(|channel, subscription| !(selector.matches(channel) && &subscription.client_id == client_id))
    }

    /// Removes every subscription owned by a connection session.
    pub fn unsubscribe_session(&self, session_id: &str) -> usize {
        self.retain(|_, subscription| subscription.client_id.session_id != session_id)
    }

    /// Removes a single registration.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);

        for registrations in channels.values_mut() {
            if let Some(index) = registrations.iter().position(|registration| registration.id == id) {
                registrations.remove(index);
                channels.retain(|_, registrations| !registrations.is_empty());
                return true;
            }
        }

        false
    }

    /// Sends the payload to every subscriber of `channel` whose filter matches it.
    /// Returns the number of notifications delivered.
    #[tracing::instrument(skip(self, payload))]
    pub fn publish(&self, payload: Value, channel: &str) -> usize {
        let registrations = {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            match channels.get(channel) {
                Some(registrations) => registrations.clone(),
                None => return 0,
            }
        };

        let payload = Arc::new(payload);
        let mut delivered = 0;
        let mut closed = Vec::new();

        for Registration { id, subscription } in registrations {
            match subscription.filter.evaluate(&payload) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(error) => {
                    tracing::debug!(client_id = %subscription.client_id, %error, "filter could not be evaluated");
                    continue;
                }
            }

            if subscription.notify(&payload) {
                delivered += 1;
            } else {
                closed.push(id);
            }
        }

        for id in closed {
            self.remove(id);
        }

        tracing::debug!(delivered, "published");

        delivered
    }

    pub fn subscription_count(&self) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .values()
            .flatten()
            .filter(|registration| !registration.subscription.is_closed())
            .count()
    }

    fn retain(&self, keep: impl Fn(&str, &EventSubscription<Op>) -> bool) -> usize {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;

        for (channel, registrations) in channels.iter_mut() {
            let before = registrations.len();
            registrations.retain(|registration| keep(channel, &registration.subscription));
            removed += before - registrations.len();
        }

        channels.retain(|_, registrations| !registrations.is_empty());
        removed
    }
}

impl<Op> std::fmt::Debug for EventBus<Op> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscription_count", &self.subscription_count())
            .finish()
    }
}
