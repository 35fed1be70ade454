//! Summaries computed over lists already fetched from the backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{Invitation, PassageLog, PassageType, Record, Vehicle, VehicleTier};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassageCounts {
    pub entries: usize,
    pub exits: usize,
    /// Rows whose passage type is neither entry nor exit.
    pub unknown: usize,
}

pub fn passage_counts(logs: &[PassageLog]) -> PassageCounts {
    logs.iter().fold(PassageCounts::default(), |mut counts, log| {
        match log.kind() {
            Some(PassageType::Entry) => counts.entries += 1,
            Some(PassageType::Exit) => counts.exits += 1,
            None => counts.unknown += 1,
        }
        counts
    })
}

/// Passages per UTC calendar day. Rows without a usable timestamp are
/// skipped.
pub fn passages_per_day(logs: &[PassageLog]) -> BTreeMap<NaiveDate, usize> {
    let mut days = BTreeMap::new();
    for at in logs.iter().filter_map(PassageLog::occurred_at) {
        *days.entry(at.date_naive()).or_insert(0) += 1;
    }
    days
}

/// Visitors whose latest passage is an entry.
pub fn visitors_inside(logs: &[PassageLog]) -> Vec<String> {
    let mut latest: HashMap<&str, (Option<DateTime<Utc>>, Option<PassageType>)> = HashMap::new();

    for log in logs {
        let Some(visitor) = log.visitor.as_deref() else {
            continue;
        };
        let at = log.occurred_at();
        let newer = latest.get(visitor).map_or(true, |(seen, _)| at >= *seen);
        if newer {
            latest.insert(visitor, (at, log.kind()));
        }
    }

    let mut inside: Vec<String> = latest
        .into_iter()
        .filter(|(_, (_, kind))| *kind == Some(PassageType::Entry))
        .map(|(visitor, _)| visitor.to_string())
        .collect();
    inside.sort();
    inside
}

/// Vehicle count for every tier, zero included. Unknown tiers are left out.
pub fn vehicles_by_tier(vehicles: &[Vehicle]) -> BTreeMap<VehicleTier, usize> {
    let mut tiers: BTreeMap<VehicleTier, usize> =
        VehicleTier::ALL.into_iter().map(|tier| (tier, 0)).collect();
    for tier in vehicles.iter().filter_map(Vehicle::vehicle_tier) {
        *tiers.entry(tier).or_insert(0) += 1;
    }
    tiers
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvitationActivity {
    /// Usable right now.
    pub current: usize,
    pub upcoming: usize,
    pub expired: usize,
    /// Switched off by hand.
    pub inactive: usize,
}

pub fn invitation_activity(invitations: &[Invitation], now: DateTime<Utc>) -> InvitationActivity {
    let mut activity = InvitationActivity::default();
    for invitation in invitations {
        if !invitation.active {
            activity.inactive += 1;
        } else if invitation.starts_at().is_some_and(|start| now < start) {
            activity.upcoming += 1;
        } else if invitation.ends_at().is_some_and(|end| end <= now) {
            activity.expired += 1;
        } else {
            activity.current += 1;
        }
    }
    activity
}

/// Items whose haystack contains every whitespace-separated term of
/// `query`, ignoring case. A blank query matches everything.
pub fn search<'a, T>(items: &'a [T], query: &str, haystack: impl Fn(&T) -> String) -> Vec<&'a T> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    items
        .iter()
        .filter(|item| {
            let text = haystack(*item).to_lowercase();
            terms.iter().all(|term| text.contains(term.as_str()))
        })
        .collect()
}

/// Newest first. Records with an unparseable `created` go last.
pub fn sort_by_created_desc<T: Record>(items: &mut [T]) {
    items.sort_by(|a, b| b.meta().created_at().cmp(&a.meta().created_at()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visitor;
    use chrono::TimeZone;
    use serde_json::json;

    fn log(id: &str, visitor: &str, kind: &str, at: &str) -> PassageLog {
        serde_json::from_value(json!({
            "id": id,
            "visitor": visitor,
            "passage_type": kind,
            "passage_time": at
        }))
        .unwrap()
    }

    fn logs() -> Vec<PassageLog> {
        vec![
            log("p1", "v1", "entry", "2024-05-01 08:00:00.000Z"),
            log("p2", "v2", "entry", "2024-05-01 09:00:00.000Z"),
            log("p3", "v1", "exit", "2024-05-01 10:00:00.000Z"),
            log("p4", "v3", "entry", "2024-05-02 07:00:00.000Z"),
            log("p5", "v3", "teleport", "2024-05-02 07:30:00.000Z"),
        ]
    }

    #[test]
    fn test_passage_counts_and_days() {
        let logs = logs();
        assert_eq!(
            passage_counts(&logs),
            PassageCounts {
                entries: 3,
                exits: 1,
                unknown: 1
            }
        );

        let days = passages_per_day(&logs);
        assert_eq!(days[&NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()], 3);
        assert_eq!(days[&NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()], 2);
    }

    #[test]
    fn test_visitors_inside_uses_latest_passage() {
        // v3's latest row has an unknown type, so v3 is not counted
        assert_eq!(visitors_inside(&logs()), vec!["v2".to_string()]);

        let mut shuffled = logs();
        shuffled.reverse();
        assert_eq!(visitors_inside(&shuffled), vec!["v2".to_string()]);
    }

    #[test]
    fn test_vehicles_by_tier_includes_empty_tiers() {
        let vehicles: Vec<Vehicle> = serde_json::from_value(json!([
            {"id": "c1", "license_plate": "A1", "tier": "resident"},
            {"id": "c2", "license_plate": "A2", "tier": "resident"},
            {"id": "c3", "license_plate": "A3", "tier": "vip"}
        ]))
        .unwrap();

        let tiers = vehicles_by_tier(&vehicles);
        assert_eq!(tiers[&VehicleTier::Resident], 2);
        assert_eq!(tiers[&VehicleTier::Blacklisted], 0);
        assert_eq!(tiers.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_invitation_activity() {
        let invitations: Vec<Invitation> = serde_json::from_value(json!([
            {"id": "i1", "visitor_name": "A", "active": true,
             "start_time": "2024-05-01 08:00:00.000Z", "end_time": "2024-05-01 18:00:00.000Z"},
            {"id": "i2", "visitor_name": "B", "active": true,
             "start_time": "2024-05-02 08:00:00.000Z", "end_time": "2024-05-02 18:00:00.000Z"},
            {"id": "i3", "visitor_name": "C", "active": true,
             "start_time": "2024-04-01 08:00:00.000Z", "end_time": "2024-04-01 18:00:00.000Z"},
            {"id": "i4", "visitor_name": "D", "active": false}
        ]))
        .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            invitation_activity(&invitations, now),
            InvitationActivity {
                current: 1,
                upcoming: 1,
                expired: 1,
                inactive: 1
            }
        );
    }

    #[test]
    fn test_search_and_sort() {
        let mut visitors: Vec<Visitor> = serde_json::from_value(json!([
            {"id": "v1", "first_name": "Somchai", "last_name": "Jaidee", "created": "2024-05-01 08:00:00.000Z"},
            {"id": "v2", "first_name": "Malee", "last_name": "Srisuk", "created": "2024-05-03 08:00:00.000Z"},
            {"id": "v3", "first_name": "Somsak", "last_name": "Srisuk", "created": "bad"}
        ]))
        .unwrap();

        let hits = search(&visitors, "som SRI", |v| v.full_name());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.id, "v3");
        assert_eq!(search(&visitors, "  ", |v| v.full_name()).len(), 3);

        sort_by_created_desc(&mut visitors);
        let order: Vec<&str> = visitors.iter().map(|v| v.id()).collect();
        assert_eq!(order, vec!["v2", "v1", "v3"]);
    }
}
