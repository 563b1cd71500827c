//! Background listener applying states published by other contexts

use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, info, warn};

use crate::{
    state::TimerState,
    sync::{ContextId, SyncMessage},
};

/// Deliver every foreign message on `rx` to `on_state`, in arrival order
pub async fn sync_listener_task<F>(
    mut rx: Receiver<SyncMessage>,
    channel: Arc<str>,
    context: ContextId,
    on_state: F,
) where
    F: Fn(TimerState) + Send + 'static,
{
    debug!("Context {} listening on '{}'", context, channel);

    loop {
        match rx.recv().await {
            Ok(message) if message.origin == context => {}
            Ok(message) => {
                debug!(
                    "Context {} received state from context {}: {:?}",
                    context, message.origin, message.state
                );
                on_state(message.state);
            }
            Err(RecvError::Lagged(skipped)) => {
                // Older states are superseded anyway; carry on with the newest
                warn!("Context {} skipped {} stale sync message(s)", context, skipped);
            }
            Err(RecvError::Closed) => {
                info!("Sync channel '{}' closed, context {} stops listening", channel, context);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::{broadcast, mpsc};

    use super::*;

    #[tokio::test]
    async fn lagging_listener_keeps_newest_state() {
        let (tx, rx) = broadcast::channel(1);
        for start in [1, 2, 3] {
            tx.send(SyncMessage {
                origin: 9,
                state: TimerState::new().toggle(start),
            })
            .unwrap();
        }
        drop(tx);

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        sync_listener_task(rx, Arc::from("study-timer"), 1, move |state| {
            let _ = seen_tx.send(state);
        })
        .await;

        let mut seen = Vec::new();
        while let Ok(state) = seen_rx.try_recv() {
            seen.push(state);
        }
        assert_eq!(seen, vec![TimerState::new().toggle(3)]);
    }
}
