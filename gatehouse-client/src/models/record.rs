use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Fields every backend record carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub id: String,
    #[serde(default)]
    pub collection_id: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    /// Related records inlined when the request asked for `expand`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<Map<String, Value>>,
}

impl RecordMeta {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.created)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.updated)
    }

    /// A single expanded relation, if present and of the expected shape.
    pub fn expanded<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        let value = self.expand.as_ref()?.get(field)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// An expanded multi-relation. Missing expansions give an empty list.
    pub fn expanded_list<T: DeserializeOwned>(&self, field: &str) -> Vec<T> {
        match self.expand.as_ref().and_then(|e| e.get(field)) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            Some(single @ Value::Object(_)) => serde_json::from_value(single.clone())
                .ok()
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Anything stored as a backend record.
pub trait Record {
    fn meta(&self) -> &RecordMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }
}

impl Record for RecordMeta {
    fn meta(&self) -> &RecordMeta {
        self
    }
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub items: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn is_last_page(&self) -> bool {
        self.total_pages <= 0 || i64::from(self.page) >= self.total_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Ids held by a relation field: a single id, a list, empty string, null
/// or missing all work.
pub fn relation_ids(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(id)) if !id.is_empty() => vec![id.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn relation_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(relation_ids(value.as_ref()))
}

/// Single relations come back as `""` when unset.
pub(crate) fn optional_relation<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Backend timestamps look like `2024-03-01 08:00:00.000Z`; RFC 3339 is
/// accepted as well.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = value.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|dt| dt.and_utc())
}

/// The backend's own timestamp format, for filters and payloads.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}
