use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Registration Value Objects
// ============================================================================

/// Conference the registration runs for (tenant context of every request)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceAlias {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl ConferenceAlias {
    pub fn new(id: Uuid, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Requested number of seats of one seat type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatQuantity {
    pub seat_type: Uuid,
    pub quantity: i32,
}

impl SeatQuantity {
    pub fn new(seat_type: Uuid, quantity: i32) -> Self {
        Self { seat_type, quantity }
    }
}

/// Payment type token posted by the registrant form for card payments
pub const THIRD_PARTY_PROCESSOR_PAYMENT: &str = "thirdParty";

/// Payment type token for invoice payments
pub const INVOICE_PAYMENT: &str = "invoice";
