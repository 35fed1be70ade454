use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::{Record, RecordMeta};
use crate::utils::validation::not_blank;

pub const COLLECTION: &str = "area";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewArea {
    #[validate(custom(function = "not_blank", message = "Area name is required"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Record for Area {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
