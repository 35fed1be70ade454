use chrono::{DateTime, Duration, Utc};
use gatehouse_core::error::AppError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    AreaRepository, HouseRepository, InvitationRepository, PassageLogRepository, UserRepository,
    VehicleRepository, VisitorRepository,
};
use crate::models::{UserRole, VehicleTier};
use crate::services::CollectionClient;
use crate::utils::stats::{self, InvitationActivity, PassageCounts};

/// How far back passages are read to decide who is still inside.
pub const PRESENCE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub areas: usize,
    pub houses: usize,
    pub residents: usize,
    pub staff: usize,
    pub visitors: i64,
    pub vehicles: usize,
    pub vehicles_by_tier: BTreeMap<VehicleTier, usize>,
    pub invitations: InvitationActivity,
    pub passages_today: PassageCounts,
    /// Visitors whose latest passage within [`PRESENCE_WINDOW_DAYS`] is an
    /// entry.
    pub visitors_inside: usize,
}

/// Summary figures, computed client-side from full collection reads.
pub struct Dashboard {
    areas: AreaRepository,
    houses: HouseRepository,
    users: UserRepository,
    visitors: VisitorRepository,
    invitations: InvitationRepository,
    vehicles: VehicleRepository,
    passages: PassageLogRepository,
}

impl Dashboard {
    pub fn new(client: &Arc<CollectionClient>, users_collection: &str) -> Self {
        Self {
            areas: AreaRepository::new(client),
            houses: HouseRepository::new(client),
            users: UserRepository::new(client, users_collection),
            visitors: VisitorRepository::new(client),
            invitations: InvitationRepository::new(client),
            vehicles: VehicleRepository::new(client),
            passages: PassageLogRepository::new(client),
        }
    }

    /// `now` decides what counts as today (UTC) and which invitations are
    /// current.
    pub async fn summary(&self, now: DateTime<Utc>) -> Result<DashboardSummary, AppError> {
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now);
        let day_end = day_start + Duration::days(1);
        let window_start = day_start - Duration::days(PRESENCE_WINDOW_DAYS);

        // One read per collection; parallel reads never share a request key
        let (areas, houses, users, visitors, invitations, vehicles, recent) = tokio::try_join!(
            self.areas.all(),
            self.houses.all(),
            self.users.all(),
            self.visitors.list(1, 1),
            self.invitations.all(),
            self.vehicles.all(),
            self.passages.between(window_start, day_end),
        )?;

        let today: Vec<_> = recent
            .iter()
            .filter(|log| log.occurred_at().is_some_and(|at| at >= day_start && at < day_end))
            .cloned()
            .collect();

        let residents = users.iter().filter(|u| u.role == UserRole::Resident).count();
        let staff = users.iter().filter(|u| u.role.is_staff()).count();

        let summary = DashboardSummary {
            areas: areas.len(),
            houses: houses.len(),
            residents,
            staff,
            visitors: visitors.total_items,
            vehicles: vehicles.len(),
            vehicles_by_tier: stats::vehicles_by_tier(&vehicles),
            invitations: stats::invitation_activity(&invitations, now),
            passages_today: stats::passage_counts(&today),
            visitors_inside: stats::visitors_inside(&recent).len(),
        };

        tracing::debug!(
            areas = summary.areas,
            visitors = summary.visitors,
            passages_today = today.len(),
            "Dashboard summary computed"
        );
        Ok(summary)
    }
}
