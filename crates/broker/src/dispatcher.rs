//! Delivery dispatcher: one independent task per (envelope, registration).
//!
//! `on_publish` is called synchronously by the broker right after an append.
//! It only spawns; every delay and handler invocation happens inside the
//! spawned chain, so a publisher (including a handler publishing a derived
//! event) never waits on consumers.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{Instrument, debug, debug_span};

use crate::envelope::Envelope;
use crate::handler::SharedHandler;
use crate::registry::Registration;
use crate::report::DeliveryReporter;
use crate::retry::{DeliveryState, RetryPolicy};

/// Counts chains that are scheduled or running, and wakes waiters at zero.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    pub(crate) fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Resolve once no chain is scheduled or running.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub(crate) struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Debug)]
pub(crate) struct Dispatcher {
    runtime: Handle,
    delivery_delay: Duration,
    policy: RetryPolicy,
    reporter: Arc<DeliveryReporter>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    pub(crate) fn new(
        runtime: Handle,
        delivery_delay: Duration,
        policy: RetryPolicy,
        reporter: Arc<DeliveryReporter>,
    ) -> Self {
        Self {
            runtime,
            delivery_delay,
            policy,
            reporter,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub(crate) fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Hold off `wait_idle` while a publish is between its closed check and
    /// `on_publish`.
    pub(crate) fn hold(&self) -> InFlightGuard {
        self.in_flight.enter()
    }

    /// Schedule one delivery chain per registration. Never blocks.
    pub(crate) fn on_publish(&self, envelope: &Envelope, registrations: Vec<Registration>) {
        for registration in registrations {
            // Entered before spawning so `wait_idle` observes the chain
            // even if the task has not been polled yet.
            let guard = self.in_flight.enter();
            self.reporter.chain_started();

            let span = debug_span!(
                "delivery",
                topic = %envelope.topic(),
                group = %registration.group(),
                offset = envelope.offset()
            );
            let chain = DeliveryChain {
                envelope: envelope.clone(),
                group: registration.group().to_string(),
                handler: registration.handler().clone(),
                delivery_delay: self.delivery_delay,
                policy: self.policy.clone(),
                reporter: self.reporter.clone(),
            };

            self.runtime.spawn(
                async move {
                    let _guard = guard;
                    chain.run().await;
                }
                .instrument(span),
            );
        }
    }
}

/// One (envelope, registration) pairing, driven to a terminal state.
///
/// Attempts run strictly one after another inside a single task.
struct DeliveryChain {
    envelope: Envelope,
    group: String,
    handler: SharedHandler,
    delivery_delay: Duration,
    policy: RetryPolicy,
    reporter: Arc<DeliveryReporter>,
}

impl DeliveryChain {
    async fn run(self) {
        let mut state = DeliveryState::initial();

        loop {
            state = match state {
                DeliveryState::Scheduled { attempt } => {
                    tokio::time::sleep(self.delay_before(attempt)).await;
                    DeliveryState::Scheduled { attempt }.start()
                }
                DeliveryState::Running { attempt } => {
                    self.reporter.attempt_started();
                    debug!(attempt, "invoking handler");

                    let running = DeliveryState::Running { attempt };
                    match invoke(&self.handler, &self.envelope) {
                        Ok(()) => running.complete(Ok(()), &self.policy),
                        Err(error) => {
                            let next = running.complete(Err(error.clone()), &self.policy);
                            self.reporter
                                .attempt_failed(&self.envelope, &self.group, &next, &error);
                            next
                        }
                    }
                }
                terminal => {
                    self.reporter.finish(&self.envelope, &self.group, terminal);
                    return;
                }
            };
        }
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            self.delivery_delay
        } else {
            self.policy.delay_for_retry(attempt)
        }
    }
}

/// Run a handler, turning both `Err` and panics into a failure message.
fn invoke(handler: &SharedHandler, envelope: &Envelope) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(envelope))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerResult;

    #[test]
    fn invoke_maps_errors_and_panics_to_messages() {
        let env = Envelope::new("t", 0, serde_json::json!({}));

        let ok: SharedHandler = Arc::new(|_: &Envelope| -> HandlerResult { Ok(()) });
        let err: SharedHandler =
            Arc::new(|_: &Envelope| -> HandlerResult { Err(anyhow::anyhow!("nope")) });
        let boom: SharedHandler = Arc::new(|_: &Envelope| -> HandlerResult { panic!("kaboom") });

        assert_eq!(invoke(&ok, &env), Ok(()));
        assert_eq!(invoke(&err, &env), Err("nope".to_string()));
        assert_eq!(
            invoke(&boom, &env),
            Err("handler panicked: kaboom".to_string())
        );
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_without_chains() {
        let in_flight = Arc::new(InFlight::default());
        in_flight.wait_idle().await;
        assert_eq!(in_flight.current(), 0);
    }

    #[tokio::test]
    async fn wait_idle_resolves_when_last_guard_drops() {
        let in_flight = Arc::new(InFlight::default());
        let guard = in_flight.enter();
        assert_eq!(in_flight.current(), 1);

        let waiter = {
            let in_flight = in_flight.clone();
            tokio::spawn(async move { in_flight.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(in_flight.current(), 0);
    }
}
