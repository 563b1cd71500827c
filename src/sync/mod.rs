//! Cross-context state propagation
//!
//! Every context publishes its whole [`TimerState`] on a named channel after
//! each transition; every other context subscribed to that channel replaces
//! its own state with whatever arrives last. There is no acknowledgement and
//! no merge.

pub mod channel;

use std::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

use crate::state::TimerState;

pub use channel::{Subscription, SyncChannel, SyncHub};

/// Default channel shared by every timer context
pub const CHANNEL_NAME: &str = "study-timer";

/// Default number of messages buffered per subscriber
pub const DEFAULT_CAPACITY: usize = 64;

/// Identifies one timer context (one open view of the timer)
pub type ContextId = u64;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique context id
pub fn next_context_id() -> ContextId {
    NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// One published state, tagged with the context that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    pub origin: ContextId,
    pub state: TimerState,
}
