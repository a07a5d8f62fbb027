//! In-flight sends with a host completion callback.
//!
//! A [`SendOperation`] is created only when the host passes a callback. It is
//! handed to the engine as a one-shot completion, so the engine can run it at
//! most once; if the engine drops it instead, `Drop` treats that as a
//! cancellation. Either way the callback reference is released exactly once.

use std::sync::Arc;

use tracing::{debug, warn};

use wsbridge_core::types::SocketHandle;

use crate::engine::{SendCompletion, SendOutcome};
use crate::host::HostFunction;
use crate::metrics::{BridgeMetrics, sends};

/// A send awaiting its completion hook.
#[derive(Debug)]
pub struct SendOperation {
    socket: SocketHandle,
    callback: Option<HostFunction>,
    metrics: Arc<BridgeMetrics>,
}

impl SendOperation {
    /// Track a send on `socket` that should run `callback` once flushed.
    pub fn new(socket: SocketHandle, callback: HostFunction, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            socket,
            callback: Some(callback),
            metrics,
        }
    }

    /// Convert into the engine's one-shot completion hook.
    pub fn into_completion(self) -> SendCompletion {
        Box::new(move |outcome| self.complete(outcome))
    }

    /// Dispose of the callback: run it on completion, release it unrun on
    /// cancellation.
    pub fn complete(mut self, outcome: SendOutcome) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        match outcome {
            SendOutcome::Completed => {
                sends::record_completed(&self.metrics);
                if let Err(e) = callback.call(&[]) {
                    sends::record_callback_raised(&self.metrics);
                    warn!(socket = %self.socket, error = %e, "Send completion callback raised");
                }
            }
            SendOutcome::Cancelled => {
                sends::record_cancelled(&self.metrics);
                debug!(socket = %self.socket, "Send cancelled, callback released");
            }
        }
    }
}

impl Drop for SendOperation {
    fn drop(&mut self) {
        if self.callback.take().is_some() {
            sends::record_cancelled(&self.metrics);
            debug!(socket = %self.socket, "Send dropped without completion, callback released");
        }
    }
}
