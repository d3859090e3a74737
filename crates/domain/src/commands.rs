//! Commands: instructions submitted to the bus to change allocation state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockline_core::{BatchRef, OrderId, Sku};

/// Command: register a purchased batch, creating the product on first sight
/// of its sku.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatch {
    pub reference: BatchRef,
    pub sku: Sku,
    pub quantity: u32,
    pub eta: Option<NaiveDate>,
}

/// Command: allocate an order line against the sku's batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocate {
    pub order_id: OrderId,
    pub sku: Sku,
    pub qty: u32,
}

/// Command: release a previously allocated order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deallocate {
    pub order_id: OrderId,
    pub sku: Sku,
    pub qty: u32,
}

/// Command: reset a batch's purchased quantity, releasing lines that no
/// longer fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatchQuantity {
    pub reference: BatchRef,
    pub new_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    CreateBatch(CreateBatch),
    Allocate(Allocate),
    Deallocate(Deallocate),
    ChangeBatchQuantity(ChangeBatchQuantity),
}

/// Discriminant used to key handler registrations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateBatch,
    Allocate,
    Deallocate,
    ChangeBatchQuantity,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateBatch(_) => CommandKind::CreateBatch,
            Command::Allocate(_) => CommandKind::Allocate,
            Command::Deallocate(_) => CommandKind::Deallocate,
            Command::ChangeBatchQuantity(_) => CommandKind::ChangeBatchQuantity,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateBatch(_) => "allocation.batch.create",
            Command::Allocate(_) => "allocation.line.allocate",
            Command::Deallocate(_) => "allocation.line.deallocate",
            Command::ChangeBatchQuantity(_) => "allocation.batch.change_quantity",
        }
    }
}

/// A concrete command type that can be pulled back out of the [`Command`]
/// union. Counterpart of [`crate::events::EventPayload`].
pub trait CommandPayload: Sized {
    const KIND: CommandKind;

    /// Returns the payload, or the original command if the variant differs.
    fn extract(command: Command) -> Result<Self, Command>;
}

macro_rules! impl_command_payload {
    ($t:ident) => {
        impl CommandPayload for $t {
            const KIND: CommandKind = CommandKind::$t;

            fn extract(command: Command) -> Result<Self, Command> {
                match command {
                    Command::$t(payload) => Ok(payload),
                    other => Err(other),
                }
            }
        }

        impl From<$t> for Command {
            fn from(value: $t) -> Self {
                Command::$t(value)
            }
        }

        impl From<$t> for crate::message::Message {
            fn from(value: $t) -> Self {
                crate::message::Message::Command(Command::$t(value))
            }
        }
    };
}

impl_command_payload!(CreateBatch);
impl_command_payload!(Allocate);
impl_command_payload!(Deallocate);
impl_command_payload!(ChangeBatchQuantity);
