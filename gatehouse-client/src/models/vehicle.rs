use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use super::record::{optional_relation, parse_datetime, relation_list, Record, RecordMeta};
use crate::utils::validation::license_plate;

pub const COLLECTION: &str = "vehicles";
pub const ACCESS_EVENT_COLLECTION: &str = "vehicle_access_events";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleTier {
    Resident,
    Staff,
    Guest,
    Invited,
    Blacklisted,
}

impl VehicleTier {
    pub const ALL: [VehicleTier; 5] = [
        VehicleTier::Resident,
        VehicleTier::Staff,
        VehicleTier::Guest,
        VehicleTier::Invited,
        VehicleTier::Blacklisted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleTier::Resident => "resident",
            VehicleTier::Staff => "staff",
            VehicleTier::Guest => "guest",
            VehicleTier::Invited => "invited",
            VehicleTier::Blacklisted => "blacklisted",
        }
    }
}

impl fmt::Display for VehicleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| format!("unknown vehicle tier '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub license_plate: String,
    #[serde(default)]
    pub area_code: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub house: Option<String>,
    #[serde(default, deserialize_with = "optional_relation")]
    pub issuer: Option<String>,
    #[serde(default, deserialize_with = "relation_list")]
    pub authorized_area: Vec<String>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub expire_time: String,
    #[serde(default)]
    pub note: String,
}

impl Vehicle {
    pub fn vehicle_tier(&self) -> Option<VehicleTier> {
        self.tier.parse().ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.expire_time)
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| expiry <= at)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewVehicle {
    #[validate(custom(function = "license_plate", message = "Invalid license plate"))]
    pub license_plate: String,
    #[validate(custom(function = "vehicle_tier", message = "Unknown vehicle tier"))]
    pub tier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default)]
    pub authorized_area: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn vehicle_tier(value: &str) -> Result<(), ValidationError> {
    value.parse::<VehicleTier>().map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("tier");
        err.message = Some(Cow::Owned(e));
        err
    })
}

/// A gate reader's report of a plate it saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleAccessEvent {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub license_plate: String,
    #[serde(default)]
    pub area_code: String,
    #[serde(default)]
    pub gate: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default, rename = "isSuccess")]
    pub is_success: bool,
    #[serde(default)]
    pub reader: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub snapshot: String,
}

impl Record for Vehicle {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

impl Record for VehicleAccessEvent {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
