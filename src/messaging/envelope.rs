use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::registration::RegistrationCommand;

/// Command plus the metadata the bus needs for routing and tracing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommandEnvelope {
    pub command_id: Uuid,
    pub command_type: String,
    /// Shared by every command of one batch
    pub correlation_id: Uuid,
    /// Position inside the batch
    pub sequence: u32,
    pub timestamp: DateTime<Utc>,
    pub command: RegistrationCommand,
}

impl CommandEnvelope {
    pub fn new(command: RegistrationCommand, correlation_id: Uuid, sequence: u32) -> Self {
        Self {
            command_id: Uuid::now_v7(),
            command_type: command.command_type().to_string(),
            correlation_id,
            sequence,
            timestamp: Utc::now(),
            command,
        }
    }

    /// Wrap a batch, numbering the commands in order
    pub fn wrap_batch(commands: Vec<RegistrationCommand>) -> Vec<Self> {
        let correlation_id = Uuid::new_v4();
        commands
            .into_iter()
            .enumerate()
            .map(|(i, command)| Self::new(command, correlation_id, i as u32))
            .collect()
    }

    /// Partition key: all commands for one order land on the same partition
    pub fn partition_key(&self) -> String {
        self.command.order_id().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::ConfirmOrder;

    #[test]
    fn test_batch_shares_correlation_and_keeps_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let envelopes = CommandEnvelope::wrap_batch(vec![
            RegistrationCommand::ConfirmOrder(ConfirmOrder { order_id: first }),
            RegistrationCommand::ConfirmOrder(ConfirmOrder { order_id: second }),
        ]);

        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].correlation_id, envelopes[1].correlation_id);
        assert_ne!(envelopes[0].command_id, envelopes[1].command_id);
        assert_eq!(envelopes[0].sequence, 0);
        assert_eq!(envelopes[1].sequence, 1);
        assert_eq!(envelopes[0].partition_key(), first.to_string());
        assert_eq!(envelopes[1].command_type, "ConfirmOrder");
    }

    #[test]
    fn test_envelope_json_roundtrip() {
        let envelope = CommandEnvelope::new(
            RegistrationCommand::ConfirmOrder(ConfirmOrder { order_id: Uuid::new_v4() }),
            Uuid::new_v4(),
            3,
        );

        let value = serde_json::to_value(&envelope).unwrap();
        let mut fields: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        fields.sort_unstable();
        assert_eq!(
            fields,
            ["command", "command_id", "command_type", "correlation_id", "sequence", "timestamp"]
        );

        let json = serde_json::to_string(&envelope).unwrap();
        let back: CommandEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
