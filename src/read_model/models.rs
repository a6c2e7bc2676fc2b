use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Read Model DTOs - Projections maintained by the write side
// ============================================================================
//
// These are snapshots. Nothing here is authoritative: a projection may lag
// any number of commands behind, which is why every DTO carries a version.
//
// ============================================================================

/// State of a draft order as projected from the reservation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftOrderState {
    /// Reservation requested, outcome not known yet
    PendingReservation,
    /// Fewer seats were available than requested
    PartiallyReserved,
    /// Every requested seat is held until the expiration date
    ReservationConfirmed,
    /// Order confirmed; the reservation is now permanent
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrderItem {
    pub seat_type: Uuid,
    pub requested_seats: i32,
    pub reserved_seats: i32,
}

impl DraftOrderItem {
    pub fn new(seat_type: Uuid, requested_seats: i32) -> Self {
        Self {
            seat_type,
            requested_seats,
            reserved_seats: 0,
        }
    }

    pub fn is_partially_fulfilled(&self) -> bool {
        self.requested_seats > self.reserved_seats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftOrder {
    pub order_id: Uuid,
    pub conference_id: Uuid,
    pub order_version: i64,
    pub state: DraftOrderState,
    pub reservation_expiration_date: Option<DateTime<Utc>>,
    pub lines: Vec<DraftOrderItem>,
}

impl DraftOrder {
    /// True when a reservation exists and its hold ended before `now`
    pub fn is_reservation_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.reservation_expiration_date, Some(expires) if expires < now)
    }

    /// The projection has been updated past the caller's known version
    pub fn is_newer_than(&self, version: i64) -> bool {
        self.order_version > version
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedOrderLine {
    pub seat_type: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedOrder {
    pub order_id: Uuid,
    pub order_version: i64,
    pub lines: Vec<PricedOrderLine>,
    pub total: Decimal,
    pub is_free_of_charge: bool,
    pub reservation_expiration_date: Option<DateTime<Utc>>,
}

impl PricedOrder {
    /// Build a priced order from its lines; the free flag follows the total
    pub fn from_lines(
        order_id: Uuid,
        order_version: i64,
        lines: Vec<PricedOrderLine>,
        reservation_expiration_date: Option<DateTime<Utc>>,
    ) -> Self {
        let total: Decimal = lines.iter().map(|l| l.line_total).sum();
        Self {
            order_id,
            order_version,
            is_free_of_charge: total.is_zero(),
            lines,
            total,
            reservation_expiration_date,
        }
    }
}

/// Seat type as published in the conference catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatType {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// May go negative when the inventory projection overshoots
    pub available_quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn draft(expires: Option<DateTime<Utc>>) -> DraftOrder {
        DraftOrder {
            order_id: Uuid::new_v4(),
            conference_id: Uuid::new_v4(),
            order_version: 3,
            state: DraftOrderState::ReservationConfirmed,
            reservation_expiration_date: expires,
            lines: vec![],
        }
    }

    #[test]
    fn test_expiry_requires_a_date() {
        let now = Utc::now();
        assert!(!draft(None).is_reservation_expired(now));
        assert!(!draft(Some(now + Duration::minutes(1))).is_reservation_expired(now));
        assert!(draft(Some(now - Duration::seconds(1))).is_reservation_expired(now));
    }

    #[test]
    fn test_version_comparison_is_strict() {
        let order = draft(None);
        assert!(order.is_newer_than(2));
        assert!(!order.is_newer_than(3));
        assert!(!order.is_newer_than(4));
    }

    #[test]
    fn test_partially_fulfilled_line() {
        let mut line = DraftOrderItem::new(Uuid::new_v4(), 4);
        assert!(line.is_partially_fulfilled());
        line.reserved_seats = 4;
        assert!(!line.is_partially_fulfilled());
    }

    #[test]
    fn test_priced_order_total_and_free_flag() {
        let seat = Uuid::new_v4();
        let line = PricedOrderLine {
            seat_type: seat,
            description: "General".to_string(),
            quantity: 2,
            unit_price: dec!(99.95),
            line_total: dec!(199.90),
        };
        let priced = PricedOrder::from_lines(Uuid::new_v4(), 1, vec![line.clone(), line], None);
        assert_eq!(priced.total, dec!(399.80));
        assert!(!priced.is_free_of_charge);

        let free = PricedOrder::from_lines(Uuid::new_v4(), 1, vec![], None);
        assert!(free.is_free_of_charge);
    }

    #[test]
    fn test_money_survives_json_exactly() {
        let priced = PricedOrder::from_lines(
            Uuid::new_v4(),
            7,
            vec![PricedOrderLine {
                seat_type: Uuid::new_v4(),
                description: "Workshop".to_string(),
                quantity: 3,
                unit_price: dec!(0.10),
                line_total: dec!(0.30),
            }],
            None,
        );

        let json = serde_json::to_string(&priced).unwrap();
        let back: PricedOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total, dec!(0.30));
        assert_eq!(back, priced);
    }
}
