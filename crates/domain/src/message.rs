//! The closed set of messages accepted by the message bus.

use serde::{Deserialize, Serialize};

use crate::allocation::{
    Allocate, Allocated, AllocationRequired, BatchCreated, BatchQuantityChanged,
    ChangeBatchQuantity, Command, CreateBatch, Event, OutOfStock,
};

/// Either a command (one handler, failures surface) or an event (any number
/// of handlers, failures isolated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum Message {
    Command(Command),
    Event(Event),
}

impl Message {
    /// Returns the name of the wrapped command or event.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Command(command) => command.name(),
            Message::Event(event) => event.event_type(),
        }
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Message::Event(event)
    }
}

macro_rules! into_message {
    ($via:ident: $($payload:ident),+ $(,)?) => {
        $(
            impl From<$payload> for Message {
                fn from(payload: $payload) -> Self {
                    Message::from($via::from(payload))
                }
            }
        )+
    };
}

into_message!(Command: CreateBatch, Allocate, ChangeBatchQuantity);
into_message!(Event: OutOfStock, AllocationRequired, Allocated, BatchCreated, BatchQuantityChanged);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_convert_into_messages() {
        let message = Message::from(Allocate::new("o1", "LAMP", 1));
        assert!(matches!(message, Message::Command(Command::Allocate(_))));
        assert_eq!(message.name(), "Allocate");

        let message = Message::from(OutOfStock { sku: "LAMP".into() });
        assert!(matches!(message, Message::Event(Event::OutOfStock(_))));
        assert_eq!(message.name(), "OutOfStock");
    }
}
