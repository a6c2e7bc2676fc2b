use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// Registration Errors
// ============================================================================

/// Fatal errors for one request. Anything recoverable (timeouts, expiry,
/// invalid input) is an outcome, not an error.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Priced order not found: {0}")]
    PricedOrderNotFound(Uuid),

    #[error("Invoice payment is not supported")]
    InvoicePaymentNotSupported,

    #[error("Unknown payment type: {0:?}")]
    UnknownPaymentType(String),

    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

/// Submission problems reported back to the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Order id is missing")]
    MissingOrderId,

    #[error("At least one seat must be requested")]
    NoSeatsRequested,

    #[error("Seat type {0} is not offered by this conference")]
    UnknownSeatType(Uuid),

    #[error("Seat type {0} is requested more than once")]
    DuplicateSeatType(Uuid),

    #[error("Invalid quantity {quantity} for seat type {seat_type} (allowed 0 to {max})")]
    QuantityOutOfRange {
        seat_type: Uuid,
        quantity: i32,
        max: i32,
    },

    #[error("First name cannot be empty")]
    EmptyFirstName,

    #[error("Last name cannot be empty")]
    EmptyLastName,

    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
}
