use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use super::commands::AssignRegistrantDetails;
use super::errors::ValidationError;
use super::views::OrderViewModel;
use crate::read_model::PricedOrder;

// ============================================================================
// Saga Outcomes - What each registration step hands back to the caller
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// Seat selection form
    ReservationEditor(ReservationEditor),
    /// Registrant and payment form
    RegistrantEditor(RegistrantEditor),
    /// Send the caller back to seat selection
    RedirectToReservation {
        conference_code: String,
        order_id: Uuid,
        order_version: i64,
    },
    /// Send the caller on to registrant details
    RedirectToRegistrant {
        conference_code: String,
        order_id: Uuid,
        order_version: i64,
    },
    /// The order is already confirmed
    CompletedOrder { conference_code: String, order_id: Uuid },
    /// The seat reservation ran out
    Expired { conference_code: String, order_id: Uuid },
    /// The read model did not catch up in time; safe to retry
    ReservationUnknown { conference_code: String, order_id: Uuid },
    /// Leave for the external payment processor
    PaymentHandoff(PaymentHandoff),
    /// Registration done, no payment needed (or payment accepted later)
    ThankYou { conference_code: String, order_id: Uuid },
}

impl RegistrationOutcome {
    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            RegistrationOutcome::ReservationEditor(_) => "reservation_editor",
            RegistrationOutcome::RegistrantEditor(_) => "registrant_editor",
            RegistrationOutcome::RedirectToReservation { .. } => "redirect_to_reservation",
            RegistrationOutcome::RedirectToRegistrant { .. } => "redirect_to_registrant",
            RegistrationOutcome::CompletedOrder { .. } => "completed_order",
            RegistrationOutcome::Expired { .. } => "expired",
            RegistrationOutcome::ReservationUnknown { .. } => "reservation_unknown",
            RegistrationOutcome::PaymentHandoff(_) => "payment_handoff",
            RegistrationOutcome::ThankYou { .. } => "thank_you",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationEditor {
    pub order_id: Uuid,
    pub order_version: i64,
    pub expiration: Option<DateTime<Utc>>,
    pub view: OrderViewModel,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrantEditor {
    pub order_id: Uuid,
    /// Version baseline to post back with the form
    pub order_version: i64,
    pub expiration: Option<DateTime<Utc>>,
    pub registrant: AssignRegistrantDetails,
    pub order: PricedOrder,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentHandoff {
    pub payment_id: Uuid,
    pub redirect_url: Url,
    pub payment_accepted_url: Url,
    pub payment_rejected_url: Url,
}
