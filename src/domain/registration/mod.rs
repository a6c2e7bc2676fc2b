// ============================================================================
// Registration Domain - Conference registration flow
// ============================================================================
//
// This module contains ALL registration-specific code:
// - Value objects (ConferenceAlias, SeatQuantity, payment type tokens)
// - Commands (RegisterToConference, AssignRegistrantDetails, ...)
// - Errors (RegistrationError, ValidationError)
// - Payment branch resolution
// - View assembly for the seat selection screen
// - Outcomes handed back to the caller
// - Saga (RegistrationSaga driving the order lifecycle)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod payment;
pub mod views;
pub mod outcomes;
pub mod saga;


// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use payment::*;
pub use views::*;
pub use outcomes::*;
pub use saga::{RegistrationSaga, SagaSettings};
