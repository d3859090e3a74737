//! Handler registry: commands map to exactly one handler, events to an
//! ordered handler list.

use std::collections::HashMap;

use stockline_core::BatchRef;
use stockline_domain::{Command, CommandKind, CommandPayload, Event, EventKind, EventPayload};

use crate::handlers::HandlerError;
use crate::unit_of_work::UnitOfWork;

type BoxedCommandHandler<U> =
    Box<dyn Fn(Command, &mut U) -> Result<Option<BatchRef>, HandlerError> + Send + Sync>;
type BoxedEventHandler<U> = Box<dyn Fn(Event, &mut U) -> Result<(), HandlerError> + Send + Sync>;

/// A registered handler; the name shows up in logs and configuration errors.
pub(crate) struct RegisteredCommandHandler<U> {
    pub(crate) name: &'static str,
    pub(crate) invoke: BoxedCommandHandler<U>,
}

pub(crate) struct RegisteredEventHandler<U> {
    pub(crate) name: &'static str,
    pub(crate) invoke: BoxedEventHandler<U>,
}

/// Mapping from message kind to handlers, assembled once at bootstrap and
/// immutable once the bus owns it.
///
/// Handlers are written against concrete payload types; registration wraps
/// them in an adapter that unwraps the union. Command kinds require exactly
/// one handler, enforced at dispatch time so a misconfigured table fails
/// fast instead of silently skipping work.
pub struct HandlerRegistry<U: UnitOfWork> {
    commands: HashMap<CommandKind, Vec<RegisteredCommandHandler<U>>>,
    events: HashMap<EventKind, Vec<RegisteredEventHandler<U>>>,
}

impl<U: UnitOfWork> HandlerRegistry<U> {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            events: HashMap::new(),
        }
    }

    /// Register the handler for a command type. A second registration for the
    /// same command is reported as a configuration error at dispatch time.
    pub fn register_command<C, H>(&mut self, name: &'static str, handler: H)
    where
        C: CommandPayload,
        H: Fn(C, &mut U) -> Result<Option<BatchRef>, HandlerError> + Send + Sync + 'static,
    {
        let invoke: BoxedCommandHandler<U> = Box::new(move |command, uow| {
            match C::extract(command) {
                Ok(payload) => handler(payload, uow),
                Err(_) => Err(HandlerError::Misrouted(name)),
            }
        });
        self.commands
            .entry(C::KIND)
            .or_default()
            .push(RegisteredCommandHandler { name, invoke });
    }

    /// Append a handler to an event type's invocation list. Handlers run in
    /// registration order.
    pub fn register_event<E, H>(&mut self, name: &'static str, handler: H)
    where
        E: EventPayload,
        H: Fn(E, &mut U) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let invoke: BoxedEventHandler<U> = Box::new(move |event, uow| {
            match E::extract(event) {
                Ok(payload) => handler(payload, uow),
                Err(_) => Err(HandlerError::Misrouted(name)),
            }
        });
        self.events
            .entry(E::KIND)
            .or_default()
            .push(RegisteredEventHandler { name, invoke });
    }

    pub(crate) fn command_handlers(&self, kind: CommandKind) -> &[RegisteredCommandHandler<U>] {
        self.commands.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn event_handlers(&self, kind: EventKind) -> &[RegisteredEventHandler<U>] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl<U: UnitOfWork> Default for HandlerRegistry<U> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use stockline_domain::{Allocate, Deallocated, OutOfStock};

    use super::*;
    use crate::test_support::{ScriptedUow, out_of_stock, sku};

    #[test]
    fn event_handlers_keep_registration_order() {
        let mut registry: HandlerRegistry<ScriptedUow> = HandlerRegistry::new();
        registry.register_event("first", |_event: OutOfStock, _uow: &mut ScriptedUow| Ok(()));
        registry.register_event("second", |_event: OutOfStock, _uow: &mut ScriptedUow| Ok(()));

        let names: Vec<&str> = registry
            .event_handlers(EventKind::OutOfStock)
            .iter()
            .map(|handler| handler.name)
            .collect();

        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn unregistered_kinds_have_no_handlers() {
        let registry: HandlerRegistry<ScriptedUow> = HandlerRegistry::new();

        assert!(registry.command_handlers(CommandKind::Allocate).is_empty());
        assert!(registry.event_handlers(EventKind::Allocated).is_empty());
    }

    #[test]
    fn adapters_reject_misrouted_messages() {
        let mut registry: HandlerRegistry<ScriptedUow> = HandlerRegistry::new();
        registry.register_event("on_deallocated", |_event: Deallocated, _uow: &mut ScriptedUow| {
            Ok(())
        });
        let handler = &registry.event_handlers(EventKind::Deallocated)[0];
        let mut uow = ScriptedUow::default();

        let err = (handler.invoke)(out_of_stock("LAMP"), &mut uow).unwrap_err();

        assert!(matches!(err, HandlerError::Misrouted("on_deallocated")));
    }

    #[test]
    fn command_adapters_unwrap_the_payload() {
        let mut registry: HandlerRegistry<ScriptedUow> = HandlerRegistry::new();
        registry.register_command("echo_qty", |cmd: Allocate, _uow: &mut ScriptedUow| {
            assert_eq!(cmd.qty, 7);
            Ok(None)
        });
        let handler = &registry.command_handlers(CommandKind::Allocate)[0];
        let mut uow = ScriptedUow::default();

        let command = Command::Allocate(Allocate {
            order_id: "order-1".parse().unwrap(),
            sku: sku("LAMP"),
            qty: 7,
        });

        assert!((handler.invoke)(command, &mut uow).unwrap().is_none());
    }
}
