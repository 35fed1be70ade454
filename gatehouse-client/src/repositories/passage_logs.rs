use chrono::{DateTime, Utc};
use gatehouse_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::models::record::format_datetime;
use crate::models::{passage_log, NewPassageLog, PassageLog};
use crate::services::{CollectionClient, QueryOptions, RecordService};
use crate::utils::Filter;

#[derive(Clone)]
pub struct PassageLogRepository {
    logs: RecordService<PassageLog>,
}

impl PassageLogRepository {
    pub fn new(client: &Arc<CollectionClient>) -> Self {
        Self {
            logs: client.collection(passage_log::COLLECTION),
        }
    }

    /// Stamps `passage_time` with now when the caller leaves it empty.
    pub async fn record_passage(&self, entry: &NewPassageLog) -> Result<PassageLog, AppError> {
        entry.validate()?;
        let mut payload = entry.clone();
        payload.passage_type = payload.passage_type.trim().to_ascii_lowercase();
        payload.verification_method = payload.verification_method.trim().to_ascii_lowercase();
        if payload.passage_time.as_deref().map_or(true, |t| t.trim().is_empty()) {
            payload.passage_time = Some(format_datetime(&Utc::now()));
        }

        let log: PassageLog = self.logs.create(&payload).await?;
        tracing::info!(
            log_id = %log.meta.id,
            visitor = %payload.visitor,
            passage_type = %payload.passage_type,
            "Passage recorded"
        );
        Ok(log)
    }

    /// Passages in `[from, to)`, oldest first.
    pub async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<PassageLog>, AppError> {
        if to <= from {
            return Err(AppError::invalid_input("Range end must be after its start"));
        }
        let filter = Filter::at_or_after("passage_time", &from).and(Filter::before("passage_time", &to));
        self.logs
            .list_all(&QueryOptions::new().filter(filter).sort("passage_time"))
            .await
    }

    pub async fn for_visitor(&self, visitor_id: &str) -> Result<Vec<PassageLog>, AppError> {
        let opts = QueryOptions::new()
            .filter(Filter::eq("visitor", visitor_id))
            .sort("-passage_time");
        self.logs.list_all(&opts).await
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<PassageLog>, AppError> {
        let opts = QueryOptions::new().sort("-passage_time").expand("visitor");
        Ok(self.logs.list(1, limit.max(1), &opts).await?.items)
    }
}
