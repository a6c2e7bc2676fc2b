use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CommandDispatcher, CommandEnvelope};
use crate::domain::registration::RegistrationCommand;

/// Bus that keeps every accepted envelope and forwards it to an optional
/// subscriber (the demo projector).
#[derive(Clone, Default)]
pub struct InMemoryCommandBus {
    sent: Arc<Mutex<Vec<CommandEnvelope>>>,
    subscriber: Option<mpsc::UnboundedSender<CommandEnvelope>>,
    rejecting: Arc<AtomicBool>,
}

impl InMemoryCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus plus the receiving end of its delivery channel
    pub fn with_subscriber() -> (Self, mpsc::UnboundedReceiver<CommandEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Self {
            subscriber: Some(tx),
            ..Self::default()
        };
        (bus, rx)
    }

    /// Make subsequent sends fail, as a broker outage would
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn sent_envelopes(&self) -> Vec<CommandEnvelope> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn sent_commands(&self) -> Vec<RegistrationCommand> {
        self.sent_envelopes().into_iter().map(|e| e.command).collect()
    }
}

#[async_trait]
impl CommandDispatcher for InMemoryCommandBus {
    async fn send_batch(&self, commands: Vec<RegistrationCommand>) -> Result<()> {
        if self.rejecting.load(Ordering::SeqCst) {
            bail!("Command bus is not accepting commands");
        }

        let envelopes = CommandEnvelope::wrap_batch(commands);

        {
            let mut sent = self
                .sent
                .lock()
                .map_err(|_| anyhow::anyhow!("Command log lock poisoned"))?;
            sent.extend(envelopes.iter().cloned());
        }

        if let Some(subscriber) = &self.subscriber {
            for envelope in envelopes {
                if subscriber.send(envelope).is_err() {
                    tracing::warn!("Command subscriber dropped, delivery skipped");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::ConfirmOrder;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_records_and_forwards() {
        let (bus, mut rx) = InMemoryCommandBus::with_subscriber();
        let order_id = Uuid::new_v4();

        bus.send(RegistrationCommand::ConfirmOrder(ConfirmOrder { order_id }))
            .await
            .unwrap();

        assert_eq!(bus.sent_commands().len(), 1);
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.command.order_id(), order_id);
    }

    #[tokio::test]
    async fn test_rejecting_bus_records_nothing() {
        let bus = InMemoryCommandBus::new();
        bus.set_rejecting(true);

        let result = bus
            .send(RegistrationCommand::ConfirmOrder(ConfirmOrder {
                order_id: Uuid::new_v4(),
            }))
            .await;

        assert!(result.is_err());
        assert!(bus.sent_commands().is_empty());
    }
}
