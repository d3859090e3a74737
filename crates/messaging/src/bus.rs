//! The message bus: single dispatch entrypoint, FIFO cascade, per-handler
//! isolation on the event path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, error, info_span, warn};

use stockline_core::{BatchRef, DispatchId};
use stockline_domain::{Command, Event, Message};

use crate::handlers::HandlerError;
use crate::registry::HandlerRegistry;
use crate::retry::{self, RetryPolicy};
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Tuning knobs for one bus instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Upper bound on messages processed by one external dispatch, cascade
    /// included. A cycle of self-re-emitting events trips this bound instead
    /// of hanging the loop.
    pub max_cascade_steps: usize,

    /// Retry policy for handler invocations that hit a concurrency conflict.
    pub retry: RetryPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_cascade_steps: 200,
            retry: RetryPolicy::default(),
        }
    }
}

/// Cooperative cancellation flag checked between cascade steps. Clones share
/// the flag.
///
/// Mid-handler interruption is deliberately not supported: a handler's unit
/// of work either commits or rolls back whole.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fatal dispatch failure surfaced to the external caller.
#[derive(Debug, Error)]
pub enum BusError {
    /// Zero or several handlers registered for a command kind.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The cascade guard tripped. Work committed by earlier steps stays
    /// committed; the remaining queue is abandoned.
    #[error("cascade exceeded {limit} messages in one dispatch")]
    CascadeOverflow { limit: usize },

    /// The caller cancelled between cascade steps.
    #[error("dispatch cancelled")]
    Cancelled,

    /// The command path failed: domain rejection, missing aggregate, or a
    /// concurrency conflict that survived every retry.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Central dispatcher. Commands route to their single handler, events fan
/// out to every registered handler, and each invocation gets a fresh
/// unit-of-work scope. Events harvested from commits join a FIFO queue until
/// the cascade settles.
///
/// Dispatch borrows `self` immutably, so one bus instance behind an `Arc`
/// serves concurrent callers; the backing store arbitrates conflicts through
/// its version checks.
pub struct MessageBus<F: UnitOfWorkFactory> {
    registry: HandlerRegistry<F::Uow>,
    uow_factory: F,
    config: BusConfig,
}

impl<F: UnitOfWorkFactory> MessageBus<F> {
    pub fn new(registry: HandlerRegistry<F::Uow>, uow_factory: F, config: BusConfig) -> Self {
        Self {
            registry,
            uow_factory,
            config,
        }
    }

    /// Dispatch one external message and settle its whole cascade.
    ///
    /// For a command, returns that command handler's value; cascaded events
    /// never contribute to it. For an event, returns `None` once every
    /// consequence has been handled.
    pub fn dispatch(&self, message: impl Into<Message>) -> Result<Option<BatchRef>, BusError> {
        self.dispatch_with_cancellation(message, &CancellationToken::new())
    }

    /// [`MessageBus::dispatch`] with a caller-held token, checked before each
    /// queued message is popped.
    pub fn dispatch_with_cancellation(
        &self,
        message: impl Into<Message>,
        cancellation: &CancellationToken,
    ) -> Result<Option<BatchRef>, BusError> {
        let message = message.into();
        let dispatch_id = DispatchId::new();
        let span = info_span!("dispatch", %dispatch_id, message = message.name());
        let _guard = span.enter();

        let mut queue = VecDeque::from([message]);
        let mut seed_result = None;
        let mut processed: usize = 0;

        loop {
            if cancellation.is_cancelled() {
                warn!(processed, "dispatch cancelled between cascade steps");
                return Err(BusError::Cancelled);
            }
            let Some(message) = queue.pop_front() else {
                break;
            };
            processed += 1;
            if processed > self.config.max_cascade_steps {
                error!(limit = self.config.max_cascade_steps, "cascade overflow");
                return Err(BusError::CascadeOverflow {
                    limit: self.config.max_cascade_steps,
                });
            }

            match message {
                Message::Command(command) => {
                    let value = self.handle_command(command, &mut queue)?;
                    if processed == 1 {
                        seed_result = value;
                    }
                }
                Message::Event(event) => self.handle_event(event, &mut queue),
            }
        }

        Ok(seed_result)
    }

    /// Exactly one handler, errors fatal to the dispatch.
    fn handle_command(
        &self,
        command: Command,
        queue: &mut VecDeque<Message>,
    ) -> Result<Option<BatchRef>, BusError> {
        let name = command.name();
        let handlers = self.registry.command_handlers(command.kind());
        let handler = match handlers {
            [handler] => handler,
            [] => {
                return Err(BusError::Configuration(format!(
                    "no handler registered for command {name}"
                )));
            }
            _ => {
                return Err(BusError::Configuration(format!(
                    "{} handlers registered for command {name}, expected exactly one",
                    handlers.len()
                )));
            }
        };

        debug!(command = name, handler = handler.name, "handling command");
        let run_once = || -> Result<(Option<BatchRef>, Vec<Event>), HandlerError> {
            let mut uow = self.uow_factory.begin();
            let value = (handler.invoke)(command.clone(), &mut uow)?;
            Ok((value, uow.take_new_events()))
        };
        let (value, harvested) = retry::run(&self.config.retry, run_once).map_err(|err| {
            error!(command = name, handler = handler.name, error = %err, "command handler failed");
            err
        })?;

        queue.extend(harvested.into_iter().map(Message::from));
        Ok(value)
    }

    /// Zero or more handlers, each isolated: a failure is logged and the
    /// siblings and the rest of the cascade go on.
    fn handle_event(&self, event: Event, queue: &mut VecDeque<Message>) {
        let name = event.name();
        let handlers = self.registry.event_handlers(event.kind());
        if handlers.is_empty() {
            debug!(event = name, "no handlers registered, skipping");
            return;
        }

        for handler in handlers {
            debug!(event = name, handler = handler.name, "handling event");
            let outcome = retry::run(&self.config.retry, || -> Result<Vec<Event>, HandlerError> {
                let mut uow = self.uow_factory.begin();
                (handler.invoke)(event.clone(), &mut uow)?;
                Ok(uow.take_new_events())
            });
            match outcome {
                Ok(harvested) => queue.extend(harvested.into_iter().map(Message::from)),
                Err(err) => {
                    error!(event = name, handler = handler.name, error = %err, "event handler failed");
                }
            }
        }
    }
}
