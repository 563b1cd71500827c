//! Named broadcast channels for timer contexts

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::{runtime::Handle, sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use super::{ContextId, SyncMessage};
use crate::{state::TimerState, tasks::sync_listener_task};

/// Registry of named channels. Cloning shares the registry.
#[derive(Debug, Clone)]
pub struct SyncHub {
    channels: Option<Arc<Mutex<HashMap<String, broadcast::Sender<SyncMessage>>>>>,
    capacity: usize,
}

impl SyncHub {
    /// Create a hub whose channels buffer `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Some(Arc::new(Mutex::new(HashMap::new()))),
            capacity: capacity.max(1),
        }
    }

    /// A hub that never hands out channels; contexts run standalone
    pub fn unavailable() -> Self {
        Self {
            channels: None,
            capacity: 1,
        }
    }

    pub fn is_available(&self) -> bool {
        self.channels.is_some()
    }

    /// Open (or join) the channel called `name`
    pub fn channel(&self, name: &str) -> Option<SyncChannel> {
        let Some(channels) = &self.channels else {
            warn!("Cross-context sync unavailable, '{}' runs single-context", name);
            return None;
        };

        let mut channels = channels.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = channels
            .entry(name.to_string())
            .or_insert_with(|| {
                info!("Opening sync channel '{}' (capacity {})", name, self.capacity);
                broadcast::channel(self.capacity).0
            })
            .clone();

        Some(SyncChannel {
            name: Arc::from(name),
            tx,
        })
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new(super::DEFAULT_CAPACITY)
    }
}

/// Handle on one named channel
#[derive(Debug, Clone)]
pub struct SyncChannel {
    name: Arc<str>,
    tx: broadcast::Sender<SyncMessage>,
}

impl SyncChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send `state` to every subscriber. Fire-and-forget.
    pub fn publish(&self, origin: ContextId, state: TimerState) {
        match self.tx.send(SyncMessage { origin, state }) {
            Ok(receivers) => debug!(
                "Context {} published on '{}' to {} receiver(s)",
                origin, self.name, receivers
            ),
            Err(_) => debug!("Context {} published on '{}' with no receivers", origin, self.name),
        }
    }

    /// Call `on_state` for every state another context publishes.
    ///
    /// The listener runs on the current tokio runtime until the returned
    /// [`Subscription`] is dropped. Outside a runtime nothing can listen and
    /// `None` is returned.
    pub fn subscribe<F>(&self, context: ContextId, on_state: F) -> Option<Subscription>
    where
        F: Fn(TimerState) + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot listen on '{}' outside a runtime: {}", self.name, e);
                return None;
            }
        };

        // Subscribe before spawning so nothing published after this call is missed
        let rx = self.tx.subscribe();
        let name = Arc::clone(&self.name);
        let handle = runtime.spawn(sync_listener_task(rx, name, context, on_state));
        debug!("Context {} subscribed to '{}'", context, self.name);

        Some(Subscription {
            context,
            channel: Arc::clone(&self.name),
            handle,
        })
    }

    /// Number of live subscriptions
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Live listener on a channel; dropping it unregisters the listener
#[derive(Debug)]
pub struct Subscription {
    context: ContextId,
    channel: Arc<str>,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("Context {} unsubscribed from '{}'", self.context, self.channel);
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::sync::mpsc;

    use super::*;

    fn running_at(start: i64) -> TimerState {
        TimerState::new().toggle(start)
    }

    #[tokio::test]
    async fn same_name_joins_same_channel() {
        let hub = SyncHub::new(8);
        let a = hub.channel("study-timer").unwrap();
        let b = hub.channel("study-timer").unwrap();
        let other = hub.channel("elsewhere").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = b.subscribe(2, move |state| {
            let _ = tx.send(state);
        });

        assert_eq!(a.receiver_count(), 1);
        assert_eq!(other.receiver_count(), 0);

        a.publish(1, running_at(77));
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, running_at(77));
    }

    #[tokio::test]
    async fn own_messages_are_skipped() {
        let hub = SyncHub::default();
        let channel = hub.channel("study-timer").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = channel.subscribe(7, move |state| {
            let _ = tx.send(state);
        });

        channel.publish(7, running_at(1));
        channel.publish(8, running_at(2));

        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, running_at(2));
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters() {
        let hub = SyncHub::default();
        let channel = hub.channel("study-timer").unwrap();

        let sub = channel.subscribe(3, |_| {}).unwrap();
        assert!(sub.is_active());
        assert_eq!(sub.context(), 3);
        assert_eq!(channel.receiver_count(), 1);

        drop(sub);
        for _ in 0..100 {
            if channel.receiver_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(channel.receiver_count(), 0);
    }

    #[test]
    fn subscribe_outside_runtime_degrades() {
        let channel = SyncHub::default().channel("study-timer").unwrap();
        assert!(channel.subscribe(1, |_| {}).is_none());
        channel.publish(1, TimerState::new());
    }

    #[test]
    fn unavailable_hub_has_no_channels() {
        let hub = SyncHub::unavailable();
        assert!(!hub.is_available());
        assert!(hub.channel("study-timer").is_none());
    }
}
