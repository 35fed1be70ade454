use gatehouse_core::error::AppError;
use std::sync::Arc;

use crate::models::{vehicle, VehicleAccessEvent};
use crate::services::{CollectionClient, QueryOptions, RecordService};
use crate::utils::Filter;

/// Read-only; events are written by the gate readers.
#[derive(Clone)]
pub struct AccessEventRepository {
    events: RecordService<VehicleAccessEvent>,
}

impl AccessEventRepository {
    pub fn new(client: &Arc<CollectionClient>) -> Self {
        Self {
            events: client.collection(vehicle::ACCESS_EVENT_COLLECTION),
        }
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<VehicleAccessEvent>, AppError> {
        let opts = QueryOptions::new().sort("-created");
        Ok(self.events.list(1, limit.max(1), &opts).await?.items)
    }

    pub async fn for_plate(&self, plate: &str, limit: u32) -> Result<Vec<VehicleAccessEvent>, AppError> {
        let opts = QueryOptions::new()
            .filter(Filter::eq("license_plate", plate))
            .sort("-created");
        Ok(self.events.list(1, limit.max(1), &opts).await?.items)
    }
}
