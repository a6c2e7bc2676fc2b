// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Registration is the only aggregate-facing flow here. It talks to the write
// side exclusively through commands (src/messaging) and observes results
// exclusively through projections (src/read_model).
//
// ============================================================================

pub mod registration;
