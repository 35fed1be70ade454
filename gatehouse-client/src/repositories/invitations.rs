use chrono::{DateTime, Utc};
use gatehouse_core::error::AppError;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::models::{invitation, Invitation, NewInvitation};
use crate::services::{CollectionClient, QueryOptions, RecordService};
use crate::utils::Filter;

#[derive(Clone)]
pub struct InvitationRepository {
    invitations: RecordService<Invitation>,
}

impl InvitationRepository {
    pub fn new(client: &Arc<CollectionClient>) -> Self {
        Self {
            invitations: client.collection(invitation::COLLECTION),
        }
    }

    pub async fn create(&self, invitation: &NewInvitation) -> Result<Invitation, AppError> {
        invitation.validate()?;
        self.invitations.create(invitation).await
    }

    pub async fn get(&self, id: &str) -> Result<Invitation, AppError> {
        self.invitations.get_one(id, &QueryOptions::new()).await
    }

    pub async fn all(&self) -> Result<Vec<Invitation>, AppError> {
        self.invitations
            .list_all(&QueryOptions::new().sort("-start_time"))
            .await
    }

    /// Invitations usable at `at`.
    pub async fn active_at(&self, at: DateTime<Utc>) -> Result<Vec<Invitation>, AppError> {
        let filter = Filter::is_true("active")
            .and(Filter::at_or_before("start_time", &at))
            .and(Filter::after("end_time", &at));
        let found = self
            .invitations
            .list_all(&QueryOptions::new().filter(filter).sort("end_time"))
            .await?;
        // Rows with unparseable windows slip through the server filter
        Ok(found.into_iter().filter(|i| i.is_valid_at(at)).collect())
    }

    pub async fn for_house(&self, house_id: &str) -> Result<Vec<Invitation>, AppError> {
        let opts = QueryOptions::new()
            .filter(Filter::eq("house", house_id))
            .sort("-start_time");
        self.invitations.list_all(&opts).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<Invitation, AppError> {
        let updated: Invitation = self.invitations.update(id, &json!({ "active": false })).await?;
        tracing::info!(invitation_id = %id, "Invitation deactivated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.invitations.delete(id).await
    }
}
