// ============================================================================
// Read Model Access
// ============================================================================
//
// Query side of the registration flow. The projections are maintained by an
// external pipeline; this module only defines how they are read.
//
// - models     - DraftOrder, PricedOrder, SeatType snapshots
// - in_memory  - HashMap-backed store used by tests and the demo
//
// ============================================================================

mod in_memory;
pub mod models;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub use in_memory::InMemoryReadModel;
pub use models::*;

/// Order projections. `Ok(None)` means "not projected (yet)", never an error.
#[async_trait]
pub trait OrderDao: Send + Sync {
    async fn find_draft_order(&self, order_id: Uuid) -> Result<Option<DraftOrder>>;
    async fn find_priced_order(&self, order_id: Uuid) -> Result<Option<PricedOrder>>;
}

/// Conference catalog projection
#[async_trait]
pub trait ConferenceDao: Send + Sync {
    async fn get_published_seat_types(&self, conference_id: Uuid) -> Result<Vec<SeatType>>;
}
