use serde::Serialize;
use uuid::Uuid;

use super::value_objects::ConferenceAlias;
use crate::read_model::{DraftOrder, DraftOrderItem, SeatType};

/// Upper bound of the quantity picker for one seat type
pub const DEFAULT_MAX_SEATS_PER_LINE: i32 = 20;

/// Seat selection screen: one row per published seat type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderViewModel {
    pub order_id: Option<Uuid>,
    pub conference_id: Uuid,
    pub conference_code: String,
    pub conference_name: String,
    pub items: Vec<OrderItemViewModel>,
}

impl OrderViewModel {
    pub fn item(&self, seat_type: Uuid) -> Option<&OrderItemViewModel> {
        self.items.iter().find(|i| i.seat_type.id == seat_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemViewModel {
    pub seat_type: SeatType,
    pub order_item: DraftOrderItem,
    pub available_quantity_for_order: i32,
    pub max_selection_quantity: i32,
    pub partially_fulfilled: bool,
}

/// Merge the seat catalog with what the order already holds.
///
/// Seats reserved by this order count as available to it, since releasing
/// them is part of changing the selection.
pub fn assemble_order_view(
    conference: &ConferenceAlias,
    seat_types: &[SeatType],
    order: Option<&DraftOrder>,
    max_seats_per_line: i32,
) -> OrderViewModel {
    let mut items: Vec<OrderItemViewModel> = seat_types
        .iter()
        .map(|seat_type| OrderItemViewModel {
            seat_type: seat_type.clone(),
            order_item: DraftOrderItem::new(seat_type.id, 0),
            available_quantity_for_order: seat_type.available_quantity.max(0),
            max_selection_quantity: seat_type.available_quantity.min(max_seats_per_line).max(0),
            partially_fulfilled: false,
        })
        .collect();

    if let Some(order) = order {
        for line in &order.lines {
            let Some(item) = items.iter_mut().find(|i| i.seat_type.id == line.seat_type) else {
                tracing::warn!(
                    order_id = %order.order_id,
                    seat_type = %line.seat_type,
                    "Order line refers to a seat type that is not published"
                );
                continue;
            };

            item.order_item = line.clone();
            item.available_quantity_for_order += line.reserved_seats;
            item.max_selection_quantity = item.available_quantity_for_order.min(max_seats_per_line);
            item.partially_fulfilled = line.is_partially_fulfilled();
        }
    }

    OrderViewModel {
        order_id: order.map(|o| o.order_id),
        conference_id: conference.id,
        conference_code: conference.code.clone(),
        conference_name: conference.name.clone(),
        items,
    }
}
