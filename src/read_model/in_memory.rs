use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{DraftOrder, PricedOrder, SeatType};
use super::{ConferenceDao, OrderDao};

#[derive(Default)]
struct Projections {
    draft_orders: HashMap<Uuid, DraftOrder>,
    priced_orders: HashMap<Uuid, PricedOrder>,
    seat_types: HashMap<Uuid, Vec<SeatType>>,
}

/// In-process projection store.
///
/// Clones share the same data, so a projector task can write while request
/// handlers read. Writes that carry an older version than the stored one are
/// ignored, mirroring a projection that never goes backwards.
#[derive(Clone, Default)]
pub struct InMemoryReadModel {
    inner: Arc<RwLock<Projections>>,
}

impl InMemoryReadModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_draft_order(&self, order: DraftOrder) {
        let mut projections = self.inner.write().await;
        match projections.draft_orders.get(&order.order_id) {
            Some(current) if current.order_version > order.order_version => {
                tracing::debug!(
                    order_id = %order.order_id,
                    stored = current.order_version,
                    incoming = order.order_version,
                    "Ignoring stale draft order projection"
                );
            }
            _ => {
                projections.draft_orders.insert(order.order_id, order);
            }
        }
    }

    pub async fn upsert_priced_order(&self, order: PricedOrder) {
        let mut projections = self.inner.write().await;
        match projections.priced_orders.get(&order.order_id) {
            Some(current) if current.order_version > order.order_version => {
                tracing::debug!(
                    order_id = %order.order_id,
                    stored = current.order_version,
                    incoming = order.order_version,
                    "Ignoring stale priced order projection"
                );
            }
            _ => {
                projections.priced_orders.insert(order.order_id, order);
            }
        }
    }

    pub async fn publish_seat_types(&self, conference_id: Uuid, seat_types: Vec<SeatType>) {
        self.inner
            .write()
            .await
            .seat_types
            .insert(conference_id, seat_types);
    }
}

#[async_trait]
impl OrderDao for InMemoryReadModel {
    async fn find_draft_order(&self, order_id: Uuid) -> Result<Option<DraftOrder>> {
        Ok(self.inner.read().await.draft_orders.get(&order_id).cloned())
    }

    async fn find_priced_order(&self, order_id: Uuid) -> Result<Option<PricedOrder>> {
        Ok(self.inner.read().await.priced_orders.get(&order_id).cloned())
    }
}

#[async_trait]
impl ConferenceDao for InMemoryReadModel {
    async fn get_published_seat_types(&self, conference_id: Uuid) -> Result<Vec<SeatType>> {
        Ok(self
            .inner
            .read()
            .await
            .seat_types
            .get(&conference_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::DraftOrderState;

    fn draft(order_id: Uuid, version: i64) -> DraftOrder {
        DraftOrder {
            order_id,
            conference_id: Uuid::new_v4(),
            order_version: version,
            state: DraftOrderState::PendingReservation,
            reservation_expiration_date: None,
            lines: vec![],
        }
    }

    #[tokio::test]
    async fn test_missing_order_is_none() {
        let store = InMemoryReadModel::new();
        assert!(store.find_draft_order(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.find_priced_order(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store
            .get_published_seat_types(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_stale_projection_is_ignored() {
        let store = InMemoryReadModel::new();
        let order_id = Uuid::new_v4();

        store.upsert_draft_order(draft(order_id, 2)).await;
        store.upsert_draft_order(draft(order_id, 1)).await;

        let stored = store.find_draft_order(order_id).await.unwrap().unwrap();
        assert_eq!(stored.order_version, 2);
    }

    #[tokio::test]
    async fn test_clones_share_projections() {
        let store = InMemoryReadModel::new();
        let writer = store.clone();
        let order_id = Uuid::new_v4();

        writer.upsert_draft_order(draft(order_id, 1)).await;

        assert!(store.find_draft_order(order_id).await.unwrap().is_some());
    }
}
