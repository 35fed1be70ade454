use gatehouse_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::models::{visitor, ListResult, NewVisitor, Visitor};
use crate::services::{CollectionClient, QueryOptions, RecordService};
use crate::utils::Filter;

#[derive(Clone)]
pub struct VisitorRepository {
    visitors: RecordService<Visitor>,
}

impl VisitorRepository {
    pub fn new(client: &Arc<CollectionClient>) -> Self {
        Self {
            visitors: client.collection(visitor::COLLECTION),
        }
    }

    /// Rejected before any request when a required field is missing or
    /// malformed.
    pub async fn create_visitor(&self, visitor: &NewVisitor) -> Result<Visitor, AppError> {
        visitor.validate()?;
        let created: Visitor = self.visitors.create(visitor).await?;
        tracing::info!(visitor_id = %created.meta.id, "Visitor registered");
        Ok(created)
    }

    pub async fn update_visitor(&self, id: &str, visitor: &NewVisitor) -> Result<Visitor, AppError> {
        visitor.validate()?;
        self.visitors.update(id, visitor).await
    }

    pub async fn delete_visitor(&self, id: &str) -> Result<(), AppError> {
        self.visitors.delete(id).await
    }

    pub async fn get(&self, id: &str) -> Result<Visitor, AppError> {
        self.visitors
            .get_one(id, &QueryOptions::new().expand("house,authorized_area"))
            .await
    }

    pub async fn list(&self, page: u32, per_page: u32) -> Result<ListResult<Visitor>, AppError> {
        self.visitors
            .list(page, per_page, &QueryOptions::new().sort("-created"))
            .await
    }

    /// Name search. A newer search supersedes one still in flight.
    pub async fn search(&self, name: &str, page: u32, per_page: u32) -> Result<ListResult<Visitor>, AppError> {
        let terms = name.split_whitespace().map(|term| {
            Filter::like("first_name", term)
                .or(Filter::like("last_name", term))
                .or(Filter::like("phone", term))
        });
        let opts = QueryOptions::new()
            .maybe_filter(Filter::all(terms))
            .sort("-created")
            .request_key("visitor-search");
        self.visitors.list(page, per_page, &opts).await
    }

    pub async fn for_house(&self, house_id: &str) -> Result<Vec<Visitor>, AppError> {
        let opts = QueryOptions::new()
            .filter(Filter::eq("house", house_id))
            .sort("-created");
        self.visitors.list_all(&opts).await
    }
}
