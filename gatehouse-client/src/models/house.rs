use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::{optional_relation, Record, RecordMeta};
use crate::utils::validation::not_blank;

pub const COLLECTION: &str = "house";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub house_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "optional_relation")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewHouse {
    #[validate(custom(function = "not_blank", message = "House number is required"))]
    pub house_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

impl Record for House {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
