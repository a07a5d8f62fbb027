//! Socket transfer configuration.

use serde::{Deserialize, Serialize};

/// Settings for handing transfer tickets from acceptor contexts to the loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum number of tickets queued between an acceptor and the loop.
    /// `None` means the queue is unbounded.
    #[serde(default)]
    pub handoff_capacity: Option<usize>,
}
