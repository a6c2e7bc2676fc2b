use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::ValidationError;
use super::value_objects::SeatQuantity;
use crate::read_model::SeatType;

// ============================================================================
// Registration Commands - Intents sent to the write side
// ============================================================================
//
// Commands are immutable once dispatched. The saga never waits for them to
// be applied; it observes their effect through the read model.
//
// ============================================================================

/// Command union, as it travels on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegistrationCommand {
    RegisterToConference(RegisterToConference),
    AssignRegistrantDetails(AssignRegistrantDetails),
    ConfirmOrder(ConfirmOrder),
    InitiateThirdPartyProcessorPayment(InitiateThirdPartyProcessorPayment),
}

impl RegistrationCommand {
    pub fn command_type(&self) -> &'static str {
        match self {
            RegistrationCommand::RegisterToConference(_) => "RegisterToConference",
            RegistrationCommand::AssignRegistrantDetails(_) => "AssignRegistrantDetails",
            RegistrationCommand::ConfirmOrder(_) => "ConfirmOrder",
            RegistrationCommand::InitiateThirdPartyProcessorPayment(_) => {
                "InitiateThirdPartyProcessorPayment"
            }
        }
    }

    /// Order the command is about (payments point at their source order)
    pub fn order_id(&self) -> Uuid {
        match self {
            RegistrationCommand::RegisterToConference(c) => c.order_id,
            RegistrationCommand::AssignRegistrantDetails(c) => c.order_id,
            RegistrationCommand::ConfirmOrder(c) => c.order_id,
            RegistrationCommand::InitiateThirdPartyProcessorPayment(c) => c.payment_source_id,
        }
    }
}

/// Reserve (or change the reservation of) seats for an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterToConference {
    pub order_id: Uuid,
    /// Stamped by the saga from the conference context
    pub conference_id: Uuid,
    pub seats: Vec<SeatQuantity>,
}

impl RegisterToConference {
    pub fn new(order_id: Uuid, seats: Vec<SeatQuantity>) -> Self {
        Self {
            order_id,
            conference_id: Uuid::nil(),
            seats,
        }
    }

    /// Check the request against the conference's published seat types
    pub fn validate(
        &self,
        published: &[SeatType],
        max_seats_per_line: i32,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.order_id.is_nil() {
            errors.push(ValidationError::MissingOrderId);
        }

        let mut seen = Vec::with_capacity(self.seats.len());
        for seat in &self.seats {
            if seen.contains(&seat.seat_type) {
                errors.push(ValidationError::DuplicateSeatType(seat.seat_type));
                continue;
            }
            seen.push(seat.seat_type);

            if !published.iter().any(|s| s.id == seat.seat_type) {
                errors.push(ValidationError::UnknownSeatType(seat.seat_type));
            }
            if seat.quantity < 0 || seat.quantity > max_seats_per_line {
                errors.push(ValidationError::QuantityOutOfRange {
                    seat_type: seat.seat_type,
                    quantity: seat.quantity,
                    max: max_seats_per_line,
                });
            }
        }

        if !self.seats.iter().any(|s| s.quantity > 0) {
            errors.push(ValidationError::NoSeatsRequested);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Registrant details posted from the payment step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignRegistrantDetails {
    pub order_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl AssignRegistrantDetails {
    /// Blank form bound to an order
    pub fn for_order(order_id: Uuid) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.order_id.is_nil() {
            errors.push(ValidationError::MissingOrderId);
        }
        if self.first_name.trim().is_empty() {
            errors.push(ValidationError::EmptyFirstName);
        }
        if self.last_name.trim().is_empty() {
            errors.push(ValidationError::EmptyLastName);
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.push(ValidationError::EmptyEmail);
        } else if !is_plausible_email(email) {
            errors.push(ValidationError::InvalidEmail(email.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub order_id: Uuid,
}

/// Hand the priced total over to the external payment processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiateThirdPartyProcessorPayment {
    pub payment_id: Uuid,
    pub conference_id: Uuid,
    pub payment_source_id: Uuid,
    pub description: String,
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seat_type(conference_id: Uuid) -> SeatType {
        SeatType {
            id: Uuid::new_v4(),
            conference_id,
            name: "General".to_string(),
            description: "General admission".to_string(),
            price: dec!(100),
            available_quantity: 10,
        }
    }

    #[test]
    fn test_valid_reservation() {
        let seat = seat_type(Uuid::new_v4());
        let command = RegisterToConference::new(
            Uuid::new_v4(),
            vec![SeatQuantity::new(seat.id, 2)],
        );
        assert!(command.validate(&[seat], 20).is_ok());
    }

    #[test]
    fn test_zero_lines_are_allowed_next_to_a_positive_one() {
        let a = seat_type(Uuid::new_v4());
        let b = seat_type(a.conference_id);
        let command = RegisterToConference::new(
            Uuid::new_v4(),
            vec![SeatQuantity::new(a.id, 0), SeatQuantity::new(b.id, 1)],
        );
        assert!(command.validate(&[a, b], 20).is_ok());
    }

    #[test]
    fn test_reservation_without_seats() {
        let seat = seat_type(Uuid::new_v4());
        let command = RegisterToConference::new(
            Uuid::new_v4(),
            vec![SeatQuantity::new(seat.id, 0)],
        );
        let errors = command.validate(&[seat], 20).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoSeatsRequested]);
    }

    #[test]
    fn test_reservation_rejects_foreign_seat_type_and_bad_quantities() {
        let seat = seat_type(Uuid::new_v4());
        let foreign = Uuid::new_v4();
        let command = RegisterToConference::new(
            Uuid::nil(),
            vec![
                SeatQuantity::new(seat.id, 21),
                SeatQuantity::new(foreign, 1),
                SeatQuantity::new(seat.id, 1),
            ],
        );

        let errors = command.validate(&[seat.clone()], 20).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingOrderId));
        assert!(errors.contains(&ValidationError::UnknownSeatType(foreign)));
        assert!(errors.contains(&ValidationError::DuplicateSeatType(seat.id)));
        assert!(errors.contains(&ValidationError::QuantityOutOfRange {
            seat_type: seat.id,
            quantity: 21,
            max: 20,
        }));
    }

    #[test]
    fn test_registrant_validation() {
        let mut details = AssignRegistrantDetails {
            order_id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.org".to_string(),
        };
        assert!(details.validate().is_ok());

        details.first_name = "  ".to_string();
        details.email = "ada.example.org".to_string();
        let errors = details.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyFirstName,
                ValidationError::InvalidEmail("ada.example.org".to_string()),
            ]
        );
    }

    #[test]
    fn test_blank_registrant_form() {
        let order_id = Uuid::new_v4();
        let errors = AssignRegistrantDetails::for_order(order_id)
            .validate()
            .unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyFirstName,
                ValidationError::EmptyLastName,
                ValidationError::EmptyEmail,
            ]
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_plausible_email("a@b.io"));
        assert!(!is_plausible_email("@b.io"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("a@@b.io"));
        assert!(!is_plausible_email("a b@c.io"));
    }

    #[test]
    fn test_command_routing_metadata() {
        let order_id = Uuid::new_v4();
        let payment = RegistrationCommand::InitiateThirdPartyProcessorPayment(
            InitiateThirdPartyProcessorPayment {
                payment_id: Uuid::new_v4(),
                conference_id: Uuid::new_v4(),
                payment_source_id: order_id,
                description: "Registration for RustConf".to_string(),
                total_amount: dec!(250.00),
            },
        );
        assert_eq!(payment.order_id(), order_id);
        assert_eq!(payment.command_type(), "InitiateThirdPartyProcessorPayment");

        let json = serde_json::to_string(&payment).unwrap();
        assert!(json.contains("\"type\":\"InitiateThirdPartyProcessorPayment\""));
        let back: RegistrationCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payment);
    }
}
