use cashup_ledger::{DailySummaryLedger, RewardStorage};
use cashup_types::{
    BinId, Festival, FestivalId, Geofence, PointAmount, Result, RewardError, TrashBin, User,
    UserId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FestivalSpec {
    pub name: String,
    pub budget: PointAmount,
    pub per_user_daily_cap: PointAmount,
    pub per_photo_point: PointAmount,
    pub geofence: Option<Geofence>,
}

/// Operations dashboard for one festival.
#[derive(Debug, Clone)]
pub struct FestivalOverview {
    pub festival_id: FestivalId,
    pub participant_count: usize,
    pub pending_points: PointAmount,
    pub active_points: PointAmount,
    pub used_budget: PointAmount,
    pub remaining_budget: PointAmount,
    pub bin_scan_counts: HashMap<BinId, u64>,
}

/// Registration and reporting surface for festival operators.
pub struct FestivalAdmin {
    storage: Arc<dyn RewardStorage>,
    ledger: Arc<DailySummaryLedger>,
}

impl FestivalAdmin {
    pub fn new(storage: Arc<dyn RewardStorage>, ledger: Arc<DailySummaryLedger>) -> Self {
        Self { storage, ledger }
    }

    pub async fn create_festival(&self, spec: FestivalSpec) -> Result<Festival> {
        if spec.name.trim().is_empty() {
            return Err(RewardError::InvalidRequest(
                "festival name must not be empty".to_string(),
            ));
        }
        if spec.budget.is_zero() || spec.per_user_daily_cap.is_zero() || spec.per_photo_point.is_zero()
        {
            return Err(RewardError::InvalidRequest(
                "budget, daily cap and per-photo point must all be positive".to_string(),
            ));
        }
        if spec.per_photo_point > spec.per_user_daily_cap {
            return Err(RewardError::InvalidRequest(
                "per-photo point cannot exceed the daily cap".to_string(),
            ));
        }

        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let festival = Festival {
            id: FestivalId::generate(&spec.name, nanos),
            name: spec.name,
            budget: spec.budget,
            per_user_daily_cap: spec.per_user_daily_cap,
            per_photo_point: spec.per_photo_point,
            geofence: spec.geofence,
        };
        self.storage.put_festival(festival.clone()).await?;

        info!(
            festival = %festival.id,
            name = %festival.name,
            budget = festival.budget.value(),
            "🎪 Festival registered"
        );
        Ok(festival)
    }

    pub async fn register_user(&self, display_name: &str) -> Result<User> {
        if display_name.trim().is_empty() {
            return Err(RewardError::InvalidRequest(
                "display name must not be empty".to_string(),
            ));
        }
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let user = User {
            id: UserId::generate(display_name, nanos),
            display_name: display_name.to_string(),
        };
        self.storage.put_user(user.clone()).await?;
        Ok(user)
    }

    /// Register `count` official bins, numbering on from however many the
    /// festival already has.
    pub async fn generate_bins(
        &self,
        festival_id: &FestivalId,
        count: usize,
    ) -> Result<Vec<TrashBin>> {
        self.storage
            .get_festival(festival_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("festival {}", festival_id)))?;
        if count == 0 {
            return Err(RewardError::InvalidRequest(
                "bin count must be positive".to_string(),
            ));
        }

        let existing = self.storage.count_bins(festival_id).await?;
        let mut bins = Vec::with_capacity(count);
        for n in existing + 1..=existing + count {
            let code = format!("TRASH_BIN_{:02}", n);
            let bin = TrashBin {
                id: BinId::new(code.clone()),
                festival_id: festival_id.clone(),
                code,
                name: format!("Festival Bin {:02}", n),
                description: "Official festival trash bin".to_string(),
                latitude: None,
                longitude: None,
            };
            self.storage.put_bin(bin.clone()).await?;
            bins.push(bin);
        }

        info!(
            festival = %festival_id,
            created = bins.len(),
            total = existing + count,
            "🗑 Bins registered"
        );
        Ok(bins)
    }

    pub async fn overview(&self, festival_id: &FestivalId) -> Result<FestivalOverview> {
        let festival = self
            .storage
            .get_festival(festival_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("festival {}", festival_id)))?;

        let participant_count = self.storage.count_distinct_submitters(festival_id).await?;
        let (pending_points, active_points) = self.storage.photo_point_totals(festival_id).await?;
        let used_budget = self.ledger.used_budget(festival_id).await?;
        let bin_scan_counts = self.storage.bin_scan_counts(festival_id).await?;

        Ok(FestivalOverview {
            festival_id: festival_id.clone(),
            participant_count,
            pending_points,
            active_points,
            used_budget,
            remaining_budget: festival.budget.saturating_sub(used_budget),
            bin_scan_counts,
        })
    }
}
