use gatehouse_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::models::{vehicle, ListResult, NewVehicle, Vehicle, VehicleTier};
use crate::services::{CollectionClient, QueryOptions, RecordService};
use crate::utils::Filter;

#[derive(Clone)]
pub struct VehicleRepository {
    vehicles: RecordService<Vehicle>,
}

impl VehicleRepository {
    pub fn new(client: &Arc<CollectionClient>) -> Self {
        Self {
            vehicles: client.collection(vehicle::COLLECTION),
        }
    }

    pub async fn create(&self, vehicle: &NewVehicle) -> Result<Vehicle, AppError> {
        vehicle.validate()?;
        let payload = NewVehicle {
            license_plate: normalize_plate(&vehicle.license_plate),
            tier: vehicle.tier.trim().to_ascii_lowercase(),
            ..vehicle.clone()
        };
        self.vehicles.create(&payload).await
    }

    pub async fn list(&self, page: u32, per_page: u32) -> Result<ListResult<Vehicle>, AppError> {
        self.vehicles
            .list(page, per_page, &QueryOptions::new().sort("-created"))
            .await
    }

    pub async fn all(&self) -> Result<Vec<Vehicle>, AppError> {
        self.vehicles.list_all(&QueryOptions::new()).await
    }

    pub async fn find_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, AppError> {
        let plate = normalize_plate(plate);
        if plate.is_empty() {
            return Err(AppError::invalid_input("License plate is required"));
        }
        let opts = QueryOptions::new()
            .filter(Filter::eq("license_plate", &plate))
            .no_auto_cancel();
        let page = self.vehicles.list(1, 1, &opts).await?;
        Ok(page.items.into_iter().next())
    }

    pub async fn for_house(&self, house_id: &str) -> Result<Vec<Vehicle>, AppError> {
        let opts = QueryOptions::new().filter(Filter::eq("house", house_id));
        self.vehicles.list_all(&opts).await
    }

    pub async fn by_tier(&self, tier: VehicleTier) -> Result<Vec<Vehicle>, AppError> {
        let opts = QueryOptions::new().filter(Filter::eq("tier", tier.as_str()));
        self.vehicles.list_all(&opts).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.vehicles.delete(id).await
    }
}

/// Plates are compared upper-cased with single spaces.
fn normalize_plate(plate: &str) -> String {
    plate.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate("  ab   1234 "), "AB 1234");
        assert_eq!(normalize_plate(""), "");
    }
}
