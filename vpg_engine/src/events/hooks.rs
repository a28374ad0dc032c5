use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, ReconciliationRequiredEvent, SaleFulfilledEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub sale_fulfilled_producer: Vec<EventProducer<SaleFulfilledEvent>>,
    pub reconciliation_required_producer: Vec<EventProducer<ReconciliationRequiredEvent>>,
}

impl EventProducers {
    pub async fn publish_sale_fulfilled(&self, event: SaleFulfilledEvent) {
        for producer in &self.sale_fulfilled_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_reconciliation_required(&self, event: ReconciliationRequiredEvent) {
        for producer in &self.reconciliation_required_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_sale_fulfilled: Option<EventHandler<SaleFulfilledEvent>>,
    pub on_reconciliation_required: Option<EventHandler<ReconciliationRequiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_sale_fulfilled = hooks.on_sale_fulfilled.map(|f| EventHandler::new(buffer_size, f));
        let on_reconciliation_required = hooks.on_reconciliation_required.map(|f| EventHandler::new(buffer_size, f));
        Self { on_sale_fulfilled, on_reconciliation_required }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_sale_fulfilled {
            result.sale_fulfilled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_reconciliation_required {
            result.reconciliation_required_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_sale_fulfilled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_reconciliation_required {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_sale_fulfilled: Option<Handler<SaleFulfilledEvent>>,
    pub on_reconciliation_required: Option<Handler<ReconciliationRequiredEvent>>,
}

impl EventHooks {
    pub fn on_sale_fulfilled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(SaleFulfilledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_sale_fulfilled = Some(Arc::new(f));
        self
    }

    pub fn on_reconciliation_required<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReconciliationRequiredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_reconciliation_required = Some(Arc::new(f));
        self
    }
}
