use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot},
    time::MissedTickBehavior,
};

use crate::{connection::Outgoing, messages::Message};

/// Sends a `ka` message right away and then on every tick of the interval, until stopped or
/// dropped.
pub(crate) struct KeepAlive {
    stop: Option<oneshot::Sender<()>>,
}

impl KeepAlive {
    pub(crate) fn spawn(period: Duration, sender: mpsc::Sender<Outgoing>) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        if sender.send(Outgoing::Message(Message::KeepAlive)).await.is_err() {
                            break;
                        }
                    }
                }
            }

            tracing::trace!("keep-alive stopped");
        });

        Self { stop: Some(stop) }
    }

    pub(crate) fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.send(()).ok();
        }
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop();
    }
}
