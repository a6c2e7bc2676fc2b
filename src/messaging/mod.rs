// ============================================================================
// Command Dispatch
// ============================================================================
//
// Write side of the registration flow. Sending returns once the bus has
// accepted the commands, not once they are applied. A batch is an ordered
// list handed over in one call; it is NOT atomic.
//
// - envelope  - command metadata (ids, correlation, timestamp)
// - in_memory - recording bus for tests and the demo
// - redpanda  - Kafka-compatible bus
//
// ============================================================================

mod envelope;
mod in_memory;
mod redpanda;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::registration::RegistrationCommand;

pub use envelope::CommandEnvelope;
pub use in_memory::InMemoryCommandBus;
pub use redpanda::RedpandaCommandBus;

#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Hand an ordered batch to the bus. The commands share a correlation id.
    async fn send_batch(&self, commands: Vec<RegistrationCommand>) -> Result<()>;

    async fn send(&self, command: RegistrationCommand) -> Result<()> {
        self.send_batch(vec![command]).await
    }
}
