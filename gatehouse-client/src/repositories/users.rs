use gatehouse_core::error::AppError;
use std::sync::Arc;

use crate::models::{area, user, Area, User, UserRole};
use crate::services::{CollectionClient, QueryOptions, RecordService};
use crate::utils::Filter;

/// Residents and staff.
#[derive(Clone)]
pub struct UserRepository {
    users: RecordService<User>,
    areas: RecordService<Area>,
}

impl UserRepository {
    pub fn new(client: &Arc<CollectionClient>, users_collection: &str) -> Self {
        Self {
            users: client.collection(users_collection),
            areas: client.collection(area::COLLECTION),
        }
    }

    /// Uses the `users` collection name.
    pub fn with_default_collection(client: &Arc<CollectionClient>) -> Self {
        Self::new(client, user::COLLECTION)
    }

    pub async fn get(&self, id: &str) -> Result<User, AppError> {
        self.users.get_one(id, &QueryOptions::new()).await
    }

    pub async fn all(&self) -> Result<Vec<User>, AppError> {
        self.users.list_all(&QueryOptions::new().sort("first_name")).await
    }

    pub async fn by_role(&self, role: UserRole) -> Result<Vec<User>, AppError> {
        let opts = QueryOptions::new()
            .filter(Filter::eq("role", role.as_str()))
            .sort("first_name");
        self.users.list_all(&opts).await
    }

    pub async fn residents(&self) -> Result<Vec<User>, AppError> {
        self.by_role(UserRole::Resident).await
    }

    pub async fn staff(&self) -> Result<Vec<User>, AppError> {
        let roles = [UserRole::Staff, UserRole::Guard, UserRole::Admin];
        let opts = QueryOptions::new()
            .maybe_filter(Filter::any_of("role", roles.iter().map(UserRole::as_str)))
            .sort("first_name");
        self.users.list_all(&opts).await
    }

    /// The areas `user` may enter. No areas means no request at all.
    pub async fn authorized_areas(&self, user: &User) -> Result<Vec<Area>, AppError> {
        self.areas_by_id(&user.authorized_area).await
    }

    pub async fn areas_by_id(&self, ids: &[String]) -> Result<Vec<Area>, AppError> {
        let Some(filter) = Filter::any_of("id", ids.iter().filter(|id| !id.is_empty())) else {
            return Ok(Vec::new());
        };
        self.areas
            .list_all(&QueryOptions::new().filter(filter).sort("name"))
            .await
    }
}
