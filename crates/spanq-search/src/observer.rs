//! Callbacks notified when a node's result becomes available.

use std::{
    any::Any,
    error::Error,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use crate::{Descriptor, SearchResult};

/// Receives the result of a search node.
///
/// Observers are not part of a node's identity. An observer that fails or panics is
/// logged and otherwise ignored.
pub trait SearchObserver: Send + Sync {
    /// Called once per `execute` of the node the observer is attached to.
    fn on_result(
        &self,
        descriptor: &Descriptor,
        result: &SearchResult,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Notifies each observer in turn, isolating failures.
pub(crate) fn notify(
    observers: &[Arc<dyn SearchObserver>],
    descriptor: &Descriptor,
    result: &SearchResult,
) {
    for observer in observers {
        match panic::catch_unwind(AssertUnwindSafe(|| observer.on_result(descriptor, result))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(%descriptor, error = %err, "search observer failed");
            }
            Err(payload) => {
                tracing::warn!(
                    %descriptor,
                    panic = %panic_message(payload.as_ref()),
                    "search observer panicked"
                );
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
