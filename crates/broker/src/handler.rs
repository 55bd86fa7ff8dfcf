use std::sync::Arc;

use crate::envelope::Envelope;

/// Result returned by a consumer handler.
///
/// `Err` means the delivery attempt failed and should go through the retry
/// policy of the registration that owns the handler.
pub type HandlerResult = anyhow::Result<()>;

/// Consumes envelopes delivered to a (topic, group) registration.
///
/// Handlers run synchronously inside a delivery task and are expected to
/// return quickly. They may publish to the broker (cascading events); that
/// only schedules new deliveries and never re-enters the current one.
///
/// Delivery is **at-least-once**: the same envelope is handed to a handler
/// again after a failed attempt, so handlers should tolerate duplicates.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, envelope: &Envelope) -> HandlerResult;
}

impl<F> MessageHandler for F
where
    F: Fn(&Envelope) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, envelope: &Envelope) -> HandlerResult {
        self(envelope)
    }
}

/// Shared, type-erased handler.
pub type SharedHandler = Arc<dyn MessageHandler>;
