use gatehouse_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::models::{house, House, ListResult, NewHouse};
use crate::services::{CollectionClient, QueryOptions, RecordService};
use crate::utils::Filter;

#[derive(Clone)]
pub struct HouseRepository {
    houses: RecordService<House>,
}

impl HouseRepository {
    pub fn new(client: &Arc<CollectionClient>) -> Self {
        Self {
            houses: client.collection(house::COLLECTION),
        }
    }

    pub async fn list(&self, page: u32, per_page: u32) -> Result<ListResult<House>, AppError> {
        self.houses
            .list(page, per_page, &QueryOptions::new().sort("house_number"))
            .await
    }

    pub async fn all(&self) -> Result<Vec<House>, AppError> {
        self.houses.list_all(&QueryOptions::new()).await
    }

    pub async fn in_area(&self, area_id: &str) -> Result<Vec<House>, AppError> {
        let opts = QueryOptions::new()
            .filter(Filter::eq("area", area_id))
            .sort("house_number");
        self.houses.list_all(&opts).await
    }

    pub async fn get(&self, id: &str) -> Result<House, AppError> {
        self.houses.get_one(id, &QueryOptions::new()).await
    }

    pub async fn create(&self, house: &NewHouse) -> Result<House, AppError> {
        house.validate()?;
        self.houses.create(house).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.houses.delete(id).await
    }
}
