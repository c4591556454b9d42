//! Allocation commands.

use chrono::NaiveDate;
use common::{BatchReference, OrderId, Sku};
use serde::{Deserialize, Serialize};

use super::OrderLine;

/// Imperative requests handled by exactly one handler each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Command {
    /// Register a new batch of stock.
    CreateBatch(CreateBatch),

    /// Allocate an order line to the best available batch.
    Allocate(Allocate),

    /// Change the purchased quantity of an existing batch.
    ChangeBatchQuantity(ChangeBatchQuantity),
}

impl Command {
    /// Returns the command name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateBatch(_) => "CreateBatch",
            Command::Allocate(_) => "Allocate",
            Command::ChangeBatchQuantity(_) => "ChangeBatchQuantity",
        }
    }
}

/// Command to register a new batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatch {
    pub reference: BatchReference,
    pub sku: Sku,
    pub quantity: u32,
    pub eta: Option<NaiveDate>,
}

impl CreateBatch {
    /// Creates a new CreateBatch command.
    pub fn new(
        reference: impl Into<BatchReference>,
        sku: impl Into<Sku>,
        quantity: u32,
        eta: Option<NaiveDate>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            quantity,
            eta,
        }
    }
}

/// Command to allocate an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocate {
    pub order_id: OrderId,
    pub sku: Sku,
    pub quantity: u32,
}

impl Allocate {
    /// Creates a new Allocate command.
    pub fn new(order_id: impl Into<OrderId>, sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            order_id: order_id.into(),
            sku: sku.into(),
            quantity,
        }
    }

    /// Returns the order line this command asks to allocate.
    pub fn line(&self) -> OrderLine {
        OrderLine::new(self.order_id.clone(), self.sku.clone(), self.quantity)
    }
}

/// Command to change a batch's purchased quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatchQuantity {
    pub reference: BatchReference,
    pub quantity: u32,
}

impl ChangeBatchQuantity {
    /// Creates a new ChangeBatchQuantity command.
    pub fn new(reference: impl Into<BatchReference>, quantity: u32) -> Self {
        Self {
            reference: reference.into(),
            quantity,
        }
    }
}

impl From<CreateBatch> for Command {
    fn from(cmd: CreateBatch) -> Self {
        Command::CreateBatch(cmd)
    }
}

impl From<Allocate> for Command {
    fn from(cmd: Allocate) -> Self {
        Command::Allocate(cmd)
    }
}

impl From<ChangeBatchQuantity> for Command {
    fn from(cmd: ChangeBatchQuantity) -> Self {
        Command::ChangeBatchQuantity(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_builds_order_line() {
        let cmd = Allocate::new("o1", "COMPLICATED-LAMP", 10);
        assert_eq!(cmd.line(), OrderLine::new("o1", "COMPLICATED-LAMP", 10));
    }

    #[test]
    fn command_serialization_is_tagged() {
        let cmd: Command = ChangeBatchQuantity::new("batch1", 25).into();
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "ChangeBatchQuantity");
        assert_eq!(json["data"]["reference"], "batch1");
        assert_eq!(json["data"]["quantity"], 25);
        assert_eq!(cmd.name(), "ChangeBatchQuantity");
    }
}
