//! Domain events: facts emitted by aggregate behavior.

use serde::{Deserialize, Serialize};

use stockline_core::{BatchRef, OrderId, Sku};

/// Event: an order line was allocated to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocated {
    pub order_id: OrderId,
    pub sku: Sku,
    pub qty: u32,
    pub batch_ref: BatchRef,
}

/// Event: an order line's allocation was released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deallocated {
    pub order_id: OrderId,
    pub sku: Sku,
    pub qty: u32,
}

/// Event: no batch could satisfy an order line for this sku.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStock {
    pub sku: Sku,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    Allocated(Allocated),
    Deallocated(Deallocated),
    OutOfStock(OutOfStock),
}

/// Discriminant used to key handler registrations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Allocated,
    Deallocated,
    OutOfStock,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Allocated(_) => EventKind::Allocated,
            Event::Deallocated(_) => EventKind::Deallocated,
            Event::OutOfStock(_) => EventKind::OutOfStock,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Allocated(_) => "allocation.line.allocated",
            Event::Deallocated(_) => "allocation.line.deallocated",
            Event::OutOfStock(_) => "allocation.sku.out_of_stock",
        }
    }
}

/// A concrete event type that can be pulled back out of the [`Event`] union.
///
/// Handlers are written against concrete payloads; the registry keys them by
/// [`EventKind`] and uses `extract` to unwrap the union at dispatch time.
pub trait EventPayload: Sized {
    const KIND: EventKind;

    /// Returns the payload, or the original event if the variant differs.
    fn extract(event: Event) -> Result<Self, Event>;
}

macro_rules! impl_event_payload {
    ($t:ident) => {
        impl EventPayload for $t {
            const KIND: EventKind = EventKind::$t;

            fn extract(event: Event) -> Result<Self, Event> {
                match event {
                    Event::$t(payload) => Ok(payload),
                    other => Err(other),
                }
            }
        }

        impl From<$t> for Event {
            fn from(value: $t) -> Self {
                Event::$t(value)
            }
        }

        impl From<$t> for crate::message::Message {
            fn from(value: $t) -> Self {
                crate::message::Message::Event(Event::$t(value))
            }
        }
    };
}

impl_event_payload!(Allocated);
impl_event_payload!(Deallocated);
impl_event_payload!(OutOfStock);
