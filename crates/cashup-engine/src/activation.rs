use crate::bins::normalize_bin_code;
use crate::config::EngineConfig;
use crate::geo;
use crate::locks::FestivalLocks;
use cashup_ledger::{DailySummaryLedger, RewardStorage};
use cashup_types::{
    local_date_key, BinScan, FestivalId, PhotoId, PointAmount, Result, RewardError,
    UserDailySummary, UserId,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ActivationResult {
    pub activated: PointAmount,
    pub photos_converted: usize,
    pub bin_name: String,
    pub summary: UserDailySummary,
}

/// Converts a user's pending points to active on a verified bin scan.
/// Eligible photos are the pending ones inside the trailing activation
/// window, consumed oldest first so the earliest-earned points survive
/// cap truncation.
pub struct BinActivationEngine {
    storage: Arc<dyn RewardStorage>,
    ledger: Arc<DailySummaryLedger>,
    locks: Arc<FestivalLocks>,
    config: Arc<EngineConfig>,
}

impl BinActivationEngine {
    pub fn new(
        storage: Arc<dyn RewardStorage>,
        ledger: Arc<DailySummaryLedger>,
        locks: Arc<FestivalLocks>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            storage,
            ledger,
            locks,
            config,
        }
    }

    pub async fn activate(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        bin_code: &str,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<ActivationResult> {
        let festival = self
            .storage
            .get_festival(festival_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("festival {}", festival_id)))?;
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("user {}", user_id)))?;

        let code = normalize_bin_code(bin_code);
        let bin = self
            .storage
            .get_bin(festival_id, &code)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("bin {} in festival {}", code, festival_id)))?;

        geo::check_geofence(&festival, lat, lng)?;

        let now = Utc::now();
        let date = local_date_key(now, self.config.local_offset());
        let cutoff = now - Duration::minutes(self.config.pending_activation_minutes);

        let _guard = self.locks.acquire(festival_id).await;
        self.storage.begin_transaction().await?;

        let result = async {
            // Festival budget is checked before any per-user state.
            let used = self.ledger.used_budget(festival_id).await?;
            if used >= festival.budget {
                return Err(RewardError::BudgetExhausted(format!(
                    "festival {} used {} of {}",
                    festival_id, used, festival.budget
                )));
            }

            let summary = self
                .ledger
                .get_or_create(user_id, festival_id, &date)
                .await?;
            let committed = summary.total_active.saturating_add(summary.total_consumed);
            let remaining_cap = festival.per_user_daily_cap.saturating_sub(committed);
            if remaining_cap.is_zero() {
                return Err(RewardError::CapExceeded(format!(
                    "user {} already holds {} of {} for {}",
                    user_id, committed, festival.per_user_daily_cap, date
                )));
            }

            let eligible = self
                .storage
                .pending_photos_in_window(user_id, festival_id, cutoff)
                .await?;
            if eligible.is_empty() {
                return Err(RewardError::NothingToActivate);
            }

            // Greedy FIFO batch; the first photo that would overflow the
            // cap ends the batch even if a smaller one comes later.
            let mut batch: Vec<PhotoId> = Vec::new();
            let mut accumulated = PointAmount::ZERO;
            for photo in &eligible {
                let next = accumulated.saturating_add(photo.points);
                if next > remaining_cap {
                    break;
                }
                accumulated = next;
                batch.push(photo.id.clone());
            }
            if batch.is_empty() {
                return Err(RewardError::CapExceeded(format!(
                    "no eligible photo fits the remaining cap {} for user {}",
                    remaining_cap, user_id
                )));
            }

            self.storage.mark_photos_active(&batch).await?;
            let summary = self
                .ledger
                .activate(user_id, festival_id, &date, accumulated)
                .await?;
            self.storage
                .append_bin_scan(BinScan {
                    festival_id: festival_id.clone(),
                    bin_id: bin.id.clone(),
                    user_id: user_id.clone(),
                    scanned_at: now,
                })
                .await?;

            Ok((accumulated, batch.len(), summary))
        }
        .await;

        match result {
            Ok((activated, photos_converted, summary)) => {
                self.storage.commit_transaction().await?;
                info!(
                    user = %user_id,
                    festival = %festival_id,
                    bin = %bin.id,
                    activated = activated.value(),
                    photos = photos_converted,
                    "🗑 Bin scan activated pending points"
                );
                Ok(ActivationResult {
                    activated,
                    photos_converted,
                    bin_name: bin.name,
                    summary,
                })
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }
}
