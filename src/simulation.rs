use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::registration::{RegisterToConference, RegistrationCommand};
use crate::messaging::CommandEnvelope;
use crate::read_model::{
    ConferenceDao, DraftOrder, DraftOrderItem, DraftOrderState, InMemoryReadModel, OrderDao,
    PricedOrder, PricedOrderLine, SeatType,
};

// ============================================================================
// Demo projector
// ============================================================================
//
// Stands in for the write side when no broker is configured: consumes the
// in-memory bus and updates the read model after a delay, so the saga sees
// the same lag it would see against real projections.
//
//   RegisterToConference  -> PendingReservation, then reserved + priced
//   ConfirmOrder          -> Confirmed
//   Third-party payment   -> accepted, order Confirmed
//
// ============================================================================

pub struct ReservationProjector {
    read_model: InMemoryReadModel,
    clock: Arc<dyn Clock>,
    reservation_hold: chrono::Duration,
    projection_delay: Duration,
}

impl ReservationProjector {
    pub fn new(
        read_model: InMemoryReadModel,
        clock: Arc<dyn Clock>,
        reservation_hold: chrono::Duration,
        projection_delay: Duration,
    ) -> Self {
        Self {
            read_model,
            clock,
            reservation_hold,
            projection_delay,
        }
    }

    /// Apply envelopes until every sender is gone
    pub async fn run(self, mut commands: mpsc::UnboundedReceiver<CommandEnvelope>) {
        tracing::info!("Reservation projector started");

        while let Some(envelope) = commands.recv().await {
            let command_id = envelope.command_id;
            let command_type = envelope.command_type.clone();

            if let Err(e) = self.apply(envelope).await {
                tracing::error!(
                    command_id = %command_id,
                    command_type = %command_type,
                    error = %e,
                    "Failed to project command"
                );
            }
        }

        tracing::info!("Reservation projector stopped");
    }

    pub async fn apply(&self, envelope: CommandEnvelope) -> Result<()> {
        tracing::debug!(
            command_id = %envelope.command_id,
            correlation_id = %envelope.correlation_id,
            command_type = %envelope.command_type,
            "Projecting command"
        );

        match envelope.command {
            RegistrationCommand::RegisterToConference(command) => self.reserve(command).await,
            RegistrationCommand::ConfirmOrder(command) => self.confirm(command.order_id).await,
            RegistrationCommand::InitiateThirdPartyProcessorPayment(payment) => {
                tracing::info!(
                    payment_id = %payment.payment_id,
                    order_id = %payment.payment_source_id,
                    amount = %payment.total_amount,
                    "Simulated processor accepted payment"
                );
                self.confirm(payment.payment_source_id).await
            }
            RegistrationCommand::AssignRegistrantDetails(details) => {
                tracing::debug!(order_id = %details.order_id, "Registrant recorded");
                Ok(())
            }
        }
    }

    async fn reserve(&self, command: RegisterToConference) -> Result<()> {
        let previous = self.read_model.find_draft_order(command.order_id).await?;
        let version = previous.as_ref().map_or(0, |o| o.order_version);

        // Accepted but not yet processed
        let mut pending = DraftOrder {
            order_id: command.order_id,
            conference_id: command.conference_id,
            order_version: version + 1,
            state: DraftOrderState::PendingReservation,
            reservation_expiration_date: None,
            lines: command
                .seats
                .iter()
                .map(|s| DraftOrderItem::new(s.seat_type, s.quantity))
                .collect(),
        };
        self.read_model.upsert_draft_order(pending.clone()).await;

        tokio::time::sleep(self.projection_delay).await;

        let mut seat_types = self
            .read_model
            .get_published_seat_types(command.conference_id)
            .await?;

        // Seats this order already holds go back to the pool first
        if let Some(previous) = &previous {
            for line in &previous.lines {
                if let Some(seat_type) = seat_types.iter_mut().find(|s| s.id == line.seat_type) {
                    seat_type.available_quantity += line.reserved_seats;
                }
            }
        }

        for line in pending.lines.iter_mut() {
            if let Some(seat_type) = seat_types.iter_mut().find(|s| s.id == line.seat_type) {
                line.reserved_seats = line.requested_seats.min(seat_type.available_quantity.max(0));
                seat_type.available_quantity -= line.reserved_seats;
            }
        }

        let state = if pending.lines.iter().any(DraftOrderItem::is_partially_fulfilled) {
            DraftOrderState::PartiallyReserved
        } else {
            DraftOrderState::ReservationConfirmed
        };
        let expiration = self.clock.now() + self.reservation_hold;
        let reserved = DraftOrder {
            order_version: version + 2,
            state,
            reservation_expiration_date: Some(expiration),
            ..pending
        };

        let priced = price(&reserved, &seat_types);

        tracing::info!(
            order_id = %reserved.order_id,
            order_version = reserved.order_version,
            state = ?reserved.state,
            total = %priced.total,
            "Reservation projected"
        );

        self.read_model
            .publish_seat_types(command.conference_id, seat_types)
            .await;
        self.read_model.upsert_draft_order(reserved).await;
        self.read_model.upsert_priced_order(priced).await;
        Ok(())
    }

    async fn confirm(&self, order_id: Uuid) -> Result<()> {
        tokio::time::sleep(self.projection_delay).await;

        let Some(order) = self.read_model.find_draft_order(order_id).await? else {
            anyhow::bail!("Cannot confirm unknown order {}", order_id);
        };

        self.read_model
            .upsert_draft_order(DraftOrder {
                order_version: order.order_version + 1,
                state: DraftOrderState::Confirmed,
                ..order
            })
            .await;

        tracing::info!(order_id = %order_id, "Order confirmed");
        Ok(())
    }
}

fn price(order: &DraftOrder, seat_types: &[SeatType]) -> PricedOrder {
    let lines = order
        .lines
        .iter()
        .filter(|line| line.reserved_seats > 0)
        .filter_map(|line| {
            let seat_type = seat_types.iter().find(|s| s.id == line.seat_type)?;
            Some(PricedOrderLine {
                seat_type: seat_type.id,
                description: seat_type.name.clone(),
                quantity: line.reserved_seats,
                unit_price: seat_type.price,
                line_total: seat_type.price * Decimal::from(line.reserved_seats),
            })
        })
        .collect();

    PricedOrder::from_lines(
        order.order_id,
        order.order_version,
        lines,
        order.reservation_expiration_date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::registration::{ConfirmOrder, SeatQuantity};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn seat(conference_id: Uuid, price: Decimal, available: i32) -> SeatType {
        SeatType {
            id: Uuid::new_v4(),
            conference_id,
            name: "Workshop".to_string(),
            description: "Hands-on workshop".to_string(),
            price,
            available_quantity: available,
        }
    }

    fn projector(read_model: &InMemoryReadModel) -> ReservationProjector {
        ReservationProjector::new(
            read_model.clone(),
            Arc::new(FixedClock::new(Utc::now())),
            chrono::Duration::minutes(15),
            Duration::from_millis(1),
        )
    }

    fn register(conference_id: Uuid, order_id: Uuid, seats: Vec<SeatQuantity>) -> CommandEnvelope {
        let mut command = RegisterToConference::new(order_id, seats);
        command.conference_id = conference_id;
        CommandEnvelope::new(
            RegistrationCommand::RegisterToConference(command),
            Uuid::new_v4(),
            0,
        )
    }

    #[tokio::test]
    async fn test_full_reservation_is_confirmed_and_priced() {
        let conference_id = Uuid::new_v4();
        let workshop = seat(conference_id, dec!(80), 10);
        let read_model = InMemoryReadModel::new();
        read_model
            .publish_seat_types(conference_id, vec![workshop.clone()])
            .await;
        let order_id = Uuid::new_v4();

        projector(&read_model)
            .apply(register(conference_id, order_id, vec![SeatQuantity::new(workshop.id, 3)]))
            .await
            .unwrap();

        let draft = read_model.find_draft_order(order_id).await.unwrap().unwrap();
        assert_eq!(draft.state, DraftOrderState::ReservationConfirmed);
        assert_eq!(draft.order_version, 2);
        assert!(draft.reservation_expiration_date.is_some());

        let priced = read_model.find_priced_order(order_id).await.unwrap().unwrap();
        assert_eq!(priced.order_version, 2);
        assert_eq!(priced.total, dec!(240));
        assert!(!priced.is_free_of_charge);

        let seats = read_model.get_published_seat_types(conference_id).await.unwrap();
        assert_eq!(seats[0].available_quantity, 7);
    }

    #[tokio::test]
    async fn test_short_supply_is_partially_reserved() {
        let conference_id = Uuid::new_v4();
        let workshop = seat(conference_id, dec!(80), 2);
        let read_model = InMemoryReadModel::new();
        read_model
            .publish_seat_types(conference_id, vec![workshop.clone()])
            .await;
        let order_id = Uuid::new_v4();

        projector(&read_model)
            .apply(register(conference_id, order_id, vec![SeatQuantity::new(workshop.id, 5)]))
            .await
            .unwrap();

        let draft = read_model.find_draft_order(order_id).await.unwrap().unwrap();
        assert_eq!(draft.state, DraftOrderState::PartiallyReserved);
        assert_eq!(draft.lines[0].reserved_seats, 2);
    }

    #[tokio::test]
    async fn test_changing_selection_releases_held_seats() {
        let conference_id = Uuid::new_v4();
        let workshop = seat(conference_id, Decimal::ZERO, 4);
        let read_model = InMemoryReadModel::new();
        read_model
            .publish_seat_types(conference_id, vec![workshop.clone()])
            .await;
        let order_id = Uuid::new_v4();
        let projector = projector(&read_model);

        projector
            .apply(register(conference_id, order_id, vec![SeatQuantity::new(workshop.id, 4)]))
            .await
            .unwrap();
        projector
            .apply(register(conference_id, order_id, vec![SeatQuantity::new(workshop.id, 1)]))
            .await
            .unwrap();

        let draft = read_model.find_draft_order(order_id).await.unwrap().unwrap();
        assert_eq!(draft.order_version, 4);
        assert_eq!(draft.state, DraftOrderState::ReservationConfirmed);
        let priced = read_model.find_priced_order(order_id).await.unwrap().unwrap();
        assert!(priced.is_free_of_charge);
        let seats = read_model.get_published_seat_types(conference_id).await.unwrap();
        assert_eq!(seats[0].available_quantity, 3);
    }

    #[tokio::test]
    async fn test_confirm_bumps_version() {
        let conference_id = Uuid::new_v4();
        let workshop = seat(conference_id, dec!(5), 4);
        let read_model = InMemoryReadModel::new();
        read_model
            .publish_seat_types(conference_id, vec![workshop.clone()])
            .await;
        let order_id = Uuid::new_v4();
        let projector = projector(&read_model);

        projector
            .apply(register(conference_id, order_id, vec![SeatQuantity::new(workshop.id, 1)]))
            .await
            .unwrap();
        projector
            .apply(CommandEnvelope::new(
                RegistrationCommand::ConfirmOrder(ConfirmOrder { order_id }),
                Uuid::new_v4(),
                0,
            ))
            .await
            .unwrap();

        let draft = read_model.find_draft_order(order_id).await.unwrap().unwrap();
        assert_eq!(draft.state, DraftOrderState::Confirmed);
        assert_eq!(draft.order_version, 3);
    }

    #[tokio::test]
    async fn test_confirm_unknown_order_fails() {
        let read_model = InMemoryReadModel::new();
        let result = projector(&read_model)
            .apply(CommandEnvelope::new(
                RegistrationCommand::ConfirmOrder(ConfirmOrder {
                    order_id: Uuid::new_v4(),
                }),
                Uuid::new_v4(),
                0,
            ))
            .await;

        assert!(result.is_err());
    }
}
