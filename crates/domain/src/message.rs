//! The message union accepted by the bus.

use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::events::Event;

/// Either a command or an event. This is the only type the bus dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Command(Command),
    Event(Event),
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::Command(command) => command.name(),
            Message::Event(event) => event.name(),
        }
    }
}

impl From<Command> for Message {
    fn from(value: Command) -> Self {
        Message::Command(value)
    }
}

impl From<Event> for Message {
    fn from(value: Event) -> Self {
        Message::Event(value)
    }
}
