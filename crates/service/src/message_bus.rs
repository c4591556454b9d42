//! Message bus dispatching commands and events to their handlers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use common::BatchReference;
use domain::{
    Allocated, AllocationRequired, BatchCreated, BatchQuantityChanged, Command, Event, Message,
    OutOfStock,
};
use store::UnitOfWork;

use crate::error::Result;
use crate::handlers::{self, EventHandler, Reallocate, SendOutOfStockNotification};
use crate::notifications::Notifications;
use crate::retry::RetryPolicy;

type Handlers<E, U> = Vec<Arc<dyn EventHandler<E, U>>>;

/// Event handlers, one list per event variant.
///
/// Each list runs in registration order. Adding an event variant means adding
/// a field here and an arm to [`MessageBus`]'s dispatch, which the compiler
/// enforces.
pub struct EventHandlers<U: UnitOfWork + 'static> {
    pub out_of_stock: Handlers<OutOfStock, U>,
    pub allocation_required: Handlers<AllocationRequired, U>,
    pub allocated: Handlers<Allocated, U>,
    pub batch_created: Handlers<BatchCreated, U>,
    pub batch_quantity_changed: Handlers<BatchQuantityChanged, U>,
}

impl<U: UnitOfWork + 'static> EventHandlers<U> {
    /// Creates a registry with no handlers.
    pub fn new() -> Self {
        Self {
            out_of_stock: Vec::new(),
            allocation_required: Vec::new(),
            allocated: Vec::new(),
            batch_created: Vec::new(),
            batch_quantity_changed: Vec::new(),
        }
    }

    /// Creates the production wiring: displaced lines are reallocated and
    /// stock-outs are reported to `recipient`.
    pub fn with_defaults(
        notifications: Arc<dyn Notifications>,
        recipient: impl Into<String>,
    ) -> Self {
        let mut handlers = Self::new();
        handlers.allocation_required.push(Arc::new(Reallocate));
        handlers
            .out_of_stock
            .push(Arc::new(SendOutOfStockNotification::new(
                notifications,
                recipient,
            )));
        handlers
    }

    /// Returns how many handlers are registered for this event's variant.
    pub fn handler_count(&self, event: &Event) -> usize {
        match event {
            Event::OutOfStock(_) => self.out_of_stock.len(),
            Event::AllocationRequired(_) => self.allocation_required.len(),
            Event::Allocated(_) => self.allocated.len(),
            Event::BatchCreated(_) => self.batch_created.len(),
            Event::BatchQuantityChanged(_) => self.batch_quantity_changed.len(),
        }
    }
}

impl<U: UnitOfWork + 'static> Default for EventHandlers<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: UnitOfWork + 'static> Clone for EventHandlers<U> {
    fn clone(&self) -> Self {
        Self {
            out_of_stock: self.out_of_stock.clone(),
            allocation_required: self.allocation_required.clone(),
            allocated: self.allocated.clone(),
            batch_created: self.batch_created.clone(),
            batch_quantity_changed: self.batch_quantity_changed.clone(),
        }
    }
}

impl<U: UnitOfWork + 'static> fmt::Debug for EventHandlers<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("out_of_stock", &self.out_of_stock.len())
            .field("allocation_required", &self.allocation_required.len())
            .field("allocated", &self.allocated.len())
            .field("batch_created", &self.batch_created.len())
            .field("batch_quantity_changed", &self.batch_quantity_changed.len())
            .finish()
    }
}

/// Routes messages to handlers and follows the events they raise.
///
/// A bus owns one unit of work. Messages are processed strictly FIFO: the
/// events drained after a handler are appended to the back of the queue, so
/// an event raised by a cascade is handled after everything queued before it.
///
/// Failure semantics differ by kind:
/// - a failing command aborts the whole call and its error is returned
/// - a failing event handler is retried under the [`RetryPolicy`], then
///   logged and skipped; other handlers and queued messages still run
pub struct MessageBus<U: UnitOfWork + 'static> {
    uow: U,
    handlers: Arc<EventHandlers<U>>,
    retry: RetryPolicy,
}

impl<U: UnitOfWork + 'static> MessageBus<U> {
    /// Creates a bus with the default retry policy.
    pub fn new(uow: U, handlers: Arc<EventHandlers<U>>) -> Self {
        Self {
            uow,
            handlers,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy for event handlers.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn uow(&self) -> &U {
        &self.uow
    }

    pub fn uow_mut(&mut self) -> &mut U {
        &mut self.uow
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Handles a message and every event it transitively raises.
    ///
    /// Returns one entry per command processed, in processing order: the
    /// allocated batch for `Allocate`, `None` for the others. Events
    /// contribute nothing to the result.
    #[tracing::instrument(skip(self, message), fields(message_type = message.name()))]
    pub async fn handle(&mut self, message: Message) -> Result<Vec<Option<BatchReference>>> {
        let start = Instant::now();
        let mut queue = VecDeque::from([message]);
        let mut results = Vec::new();

        while let Some(message) = queue.pop_front() {
            match message {
                Message::Command(command) => match self.handle_command(command, &mut queue).await {
                    Ok(value) => results.push(value),
                    Err(e) => {
                        metrics::histogram!("messagebus_handle_duration_seconds")
                            .record(start.elapsed().as_secs_f64());
                        return Err(e);
                    }
                },
                Message::Event(event) => self.handle_event(event, &mut queue).await,
            }
        }

        metrics::histogram!("messagebus_handle_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        Ok(results)
    }

    async fn handle_command(
        &mut self,
        command: Command,
        queue: &mut VecDeque<Message>,
    ) -> Result<Option<BatchReference>> {
        let name = command.name();
        tracing::debug!(command = name, "handling command");
        metrics::counter!("messagebus_commands_total", "command" => name).increment(1);

        let result = match command {
            Command::CreateBatch(command) => handlers::add_batch(command, &mut self.uow)
                .await
                .map(|()| None),
            Command::Allocate(command) => handlers::allocate(command, &mut self.uow)
                .await
                .map(Some),
            Command::ChangeBatchQuantity(command) => {
                handlers::change_batch_quantity(command, &mut self.uow)
                    .await
                    .map(|()| None)
            }
        };

        match result {
            Ok(value) => {
                self.collect_into(queue);
                Ok(value)
            }
            Err(e) => {
                tracing::error!(command = name, error = %e, "command failed");
                metrics::counter!("messagebus_command_failures_total", "command" => name)
                    .increment(1);
                Err(e)
            }
        }
    }

    async fn handle_event(&mut self, event: Event, queue: &mut VecDeque<Message>) {
        let event_type = event.event_type();
        tracing::debug!(
            event = event_type,
            handlers = self.handlers.handler_count(&event),
            "handling event"
        );

        let handlers = Arc::clone(&self.handlers);
        match &event {
            Event::OutOfStock(e) => {
                self.dispatch(&handlers.out_of_stock, e, event_type, queue)
                    .await
            }
            Event::AllocationRequired(e) => {
                self.dispatch(&handlers.allocation_required, e, event_type, queue)
                    .await
            }
            Event::Allocated(e) => self.dispatch(&handlers.allocated, e, event_type, queue).await,
            Event::BatchCreated(e) => {
                self.dispatch(&handlers.batch_created, e, event_type, queue)
                    .await
            }
            Event::BatchQuantityChanged(e) => {
                self.dispatch(&handlers.batch_quantity_changed, e, event_type, queue)
                    .await
            }
        }
    }

    /// Runs every handler for one event, retrying each independently.
    async fn dispatch<E>(
        &mut self,
        handlers: &[Arc<dyn EventHandler<E, U>>],
        event: &E,
        event_type: &'static str,
        queue: &mut VecDeque<Message>,
    ) where
        E: Send + Sync,
    {
        for handler in handlers {
            let mut attempt = 1;
            loop {
                let outcome = handler.handle(event, &mut self.uow).await;
                // Events raised before a failure are not lost.
                self.collect_into(queue);

                match outcome {
                    Ok(()) => break,
                    Err(e) if self.retry.should_retry(attempt) => {
                        let delay = self.retry.delay_for(attempt);
                        tracing::warn!(
                            event = event_type,
                            handler = handler.name(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "event handler failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            event = event_type,
                            handler = handler.name(),
                            attempts = attempt,
                            error = %e,
                            "event handler failed, giving up"
                        );
                        metrics::counter!(
                            "messagebus_event_handler_failures_total",
                            "event" => event_type,
                            "handler" => handler.name()
                        )
                        .increment(1);
                        break;
                    }
                }
            }
        }
    }

    fn collect_into(&mut self, queue: &mut VecDeque<Message>) {
        queue.extend(self.uow.collect_new_events().into_iter().map(Message::Event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use common::{OrderId, Sku};
    use domain::{Allocate, ChangeBatchQuantity, CreateBatch};
    use store::{InMemoryProductStore, InMemoryUnitOfWork, UnitOfWorkFactory};

    use crate::error::ServiceError;
    use crate::notifications::InMemoryNotifications;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<AllocationRequired>>,
    }

    #[async_trait]
    impl EventHandler<AllocationRequired, InMemoryUnitOfWork> for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn handle(
            &self,
            event: &AllocationRequired,
            _uow: &mut InMemoryUnitOfWork,
        ) -> Result<()> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn bus(store: &InMemoryProductStore) -> MessageBus<InMemoryUnitOfWork> {
        let handlers = EventHandlers::with_defaults(
            Arc::new(InMemoryNotifications::new()),
            "stock@made.com",
        );
        MessageBus::new(store.create(), Arc::new(handlers))
            .with_retry_policy(RetryPolicy::immediate(3))
    }

    #[tokio::test]
    async fn test_create_batch_returns_no_result_value() {
        let store = InMemoryProductStore::new();
        let mut bus = bus(&store);

        let results = bus
            .handle(CreateBatch::new("b1", "CRUNCHY-ARMCHAIR", 100, None).into())
            .await
            .unwrap();

        assert_eq!(results, vec![None]);
        assert!(bus.uow().committed());
    }

    #[tokio::test]
    async fn test_allocate_returns_batch_reference() {
        let store = InMemoryProductStore::new();
        let mut bus = bus(&store);
        bus.handle(CreateBatch::new("batch1", "COMPLICATED-LAMP", 100, None).into())
            .await
            .unwrap();

        let results = bus
            .handle(Allocate::new("o1", "COMPLICATED-LAMP", 10).into())
            .await
            .unwrap();

        assert_eq!(results, vec![Some(BatchReference::from("batch1"))]);
    }

    #[tokio::test]
    async fn test_command_error_propagates() {
        let store = InMemoryProductStore::new();
        let mut bus = bus(&store);
        bus.handle(CreateBatch::new("b1", "AREALSKU", 100, None).into())
            .await
            .unwrap();

        let err = bus
            .handle(Allocate::new("o1", "NONEXISTENTSKU", 10).into())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid sku NONEXISTENTSKU");
        assert!(store.product(&Sku::from("NONEXISTENTSKU")).await.is_none());
    }

    #[tokio::test]
    async fn test_change_quantity_triggers_single_reallocation() {
        let store = InMemoryProductStore::new();
        let recorder = Arc::new(Recorder::default());
        let mut handlers = EventHandlers::with_defaults(
            Arc::new(InMemoryNotifications::new()),
            "stock@made.com",
        );
        handlers.allocation_required.push(recorder.clone());
        let mut bus = MessageBus::new(store.create(), Arc::new(handlers))
            .with_retry_policy(RetryPolicy::immediate(3));

        for command in [
            CreateBatch::new("b1", "INDIFFERENT-TABLE", 50, None),
            CreateBatch::new(
                "b2",
                "INDIFFERENT-TABLE",
                50,
                chrono::NaiveDate::from_ymd_opt(2030, 1, 1),
            ),
        ] {
            bus.handle(command.into()).await.unwrap();
        }
        for (order, quantity) in [("o1", 20), ("o2", 20)] {
            let results = bus
                .handle(Allocate::new(order, "INDIFFERENT-TABLE", quantity).into())
                .await
                .unwrap();
            assert_eq!(results, vec![Some(BatchReference::from("b1"))]);
        }

        bus.handle(ChangeBatchQuantity::new("b1", 25).into())
            .await
            .unwrap();

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].order_id, OrderId::from("o1"));

        let product = store.product(&Sku::from("INDIFFERENT-TABLE")).await.unwrap();
        let b1 = product.batch(&BatchReference::from("b1")).unwrap();
        let b2 = product.batch(&BatchReference::from("b2")).unwrap();
        assert_eq!(b1.available_quantity(), 5);
        assert_eq!(b2.available_quantity(), 30);
    }

    #[tokio::test]
    async fn test_events_without_handlers_are_dropped() {
        let store = InMemoryProductStore::new();
        let mut bus = MessageBus::new(store.create(), Arc::new(EventHandlers::new()));

        let results = bus
            .handle(CreateBatch::new("b1", "LONELY-CHAIR", 1, None).into())
            .await
            .unwrap();

        assert_eq!(results, vec![None]);
    }

    #[tokio::test]
    async fn test_failing_notification_is_retried() {
        let store = InMemoryProductStore::new();
        let notifications = InMemoryNotifications::new();
        notifications.fail_next(2);
        let handlers =
            EventHandlers::with_defaults(Arc::new(notifications.clone()), "stock@made.com");
        let mut bus = MessageBus::new(store.create(), Arc::new(handlers))
            .with_retry_policy(RetryPolicy::immediate(3));

        bus.handle(Event::from(OutOfStock { sku: "LAMP".into() }).into())
            .await
            .unwrap();

        assert_eq!(notifications.attempts(), 3);
        assert_eq!(notifications.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_do_not_fail_the_call() {
        let store = InMemoryProductStore::new();
        let notifications = InMemoryNotifications::new();
        notifications.set_fail_on_send(true);
        let handlers =
            EventHandlers::with_defaults(Arc::new(notifications.clone()), "stock@made.com");
        let mut bus = MessageBus::new(store.create(), Arc::new(handlers))
            .with_retry_policy(RetryPolicy::immediate(3));

        let results = bus
            .handle(Event::from(OutOfStock { sku: "LAMP".into() }).into())
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(notifications.attempts(), 3);
        assert!(notifications.sent().is_empty());
    }

    #[test]
    fn test_handler_count_per_variant() {
        let handlers: EventHandlers<InMemoryUnitOfWork> =
            EventHandlers::with_defaults(Arc::new(InMemoryNotifications::new()), "x");

        assert_eq!(
            handlers.handler_count(&Event::from(OutOfStock { sku: "A".into() })),
            1
        );
        assert_eq!(
            handlers.handler_count(&Event::from(BatchQuantityChanged {
                reference: "b1".into(),
                quantity: 1
            })),
            0
        );
    }

    #[test]
    fn test_store_error_is_service_error() {
        let err: ServiceError = store::StoreError::DuplicateProduct { sku: "A".into() }.into();
        assert!(matches!(err, ServiceError::Store(_)));
    }
}
