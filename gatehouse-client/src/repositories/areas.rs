use gatehouse_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::models::{area, Area, ListResult, NewArea};
use crate::services::{CollectionClient, QueryOptions, RecordService};

#[derive(Clone)]
pub struct AreaRepository {
    areas: RecordService<Area>,
}

impl AreaRepository {
    pub fn new(client: &Arc<CollectionClient>) -> Self {
        Self {
            areas: client.collection(area::COLLECTION),
        }
    }

    pub async fn list(&self, page: u32, per_page: u32) -> Result<ListResult<Area>, AppError> {
        self.areas
            .list(page, per_page, &QueryOptions::new().sort("name"))
            .await
    }

    pub async fn all(&self) -> Result<Vec<Area>, AppError> {
        self.areas.list_all(&QueryOptions::new().sort("name")).await
    }

    pub async fn get(&self, id: &str) -> Result<Area, AppError> {
        self.areas.get_one(id, &QueryOptions::new()).await
    }

    pub async fn create(&self, area: &NewArea) -> Result<Area, AppError> {
        area.validate()?;
        self.areas.create(area).await
    }

    pub async fn update(&self, id: &str, area: &NewArea) -> Result<Area, AppError> {
        area.validate()?;
        self.areas.update(id, area).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.areas.delete(id).await
    }
}
