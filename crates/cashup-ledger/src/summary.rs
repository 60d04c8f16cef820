use crate::storage::RewardStorage;
use cashup_types::{
    Festival, FestivalId, PointAmount, Result, RewardError, UserDailySummary, UserId,
};
use std::sync::Arc;
use tracing::info;

/// Manager for per-user, per-day point balances.
///
/// Mutations re-validate the non-negativity and daily-cap invariants and
/// fail with `LedgerInvariantViolation` when a caller's earlier gate check
/// should have made the violation impossible. Callers hold the festival
/// lock across their gate check and the mutation.
pub struct DailySummaryLedger {
    storage: Arc<dyn RewardStorage>,
}

impl DailySummaryLedger {
    pub fn new(storage: Arc<dyn RewardStorage>) -> Self {
        Self { storage }
    }

    pub async fn get_or_create(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        date: &str,
    ) -> Result<UserDailySummary> {
        match self.storage.get_summary(user_id, festival_id, date).await? {
            Some(summary) => Ok(summary),
            None => Ok(UserDailySummary::empty(
                user_id.clone(),
                festival_id.clone(),
                date.to_string(),
            )),
        }
    }

    /// Festival budget already committed: every photo point ever granted
    /// plus every coupon amount ever issued, summed fresh from the rows.
    pub async fn used_budget(&self, festival_id: &FestivalId) -> Result<PointAmount> {
        let photos = self.storage.sum_photo_points(festival_id).await?;
        let coupons = self.storage.sum_coupon_amounts(festival_id).await?;
        photos.checked_add(coupons).ok_or_else(|| {
            RewardError::LedgerInvariantViolation(format!(
                "budget usage overflow for festival {}",
                festival_id
            ))
        })
    }

    /// Check-only budget gate. The caller holds the festival lock, so the
    /// usage figure cannot move between this check and the write.
    pub async fn reserve_budget(&self, festival: &Festival, amount: PointAmount) -> Result<()> {
        let used = self.used_budget(&festival.id).await?;
        let after = used.checked_add(amount).ok_or_else(|| {
            RewardError::LedgerInvariantViolation(format!(
                "budget usage overflow for festival {}",
                festival.id
            ))
        })?;
        if after > festival.budget {
            return Err(RewardError::BudgetExhausted(format!(
                "festival {} used {} of {}, cannot reserve {}",
                festival.id, used, festival.budget, amount
            )));
        }
        Ok(())
    }

    /// Credit freshly earned points into the pending bucket.
    pub async fn apply_pending_credit(
        &self,
        festival: &Festival,
        user_id: &UserId,
        date: &str,
        amount: PointAmount,
    ) -> Result<UserDailySummary> {
        let mut summary = self.get_or_create(user_id, &festival.id, date).await?;

        let day_total = summary.total().checked_add(amount).ok_or_else(|| {
            RewardError::LedgerInvariantViolation(format!(
                "daily total overflow for user {} on {}",
                user_id, date
            ))
        })?;
        if day_total > festival.per_user_daily_cap {
            return Err(RewardError::LedgerInvariantViolation(format!(
                "pending credit of {} would put user {} over the daily cap {} on {}",
                amount, user_id, festival.per_user_daily_cap, date
            )));
        }

        summary.total_pending = summary.total_pending.saturating_add(amount);
        self.storage.put_summary(summary.clone()).await?;

        info!(
            user = %user_id,
            festival = %festival.id,
            date = %date,
            amount = amount.value(),
            pending_after = summary.total_pending.value(),
            "💰 Pending points credited"
        );
        Ok(summary)
    }

    /// Move points from pending to active.
    pub async fn activate(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        date: &str,
        amount: PointAmount,
    ) -> Result<UserDailySummary> {
        let mut summary = self.get_or_create(user_id, festival_id, date).await?;

        summary.total_pending = summary.total_pending.checked_sub(amount).ok_or_else(|| {
            RewardError::LedgerInvariantViolation(format!(
                "activation of {} exceeds pending balance {} for user {} on {}",
                amount, summary.total_pending, user_id, date
            ))
        })?;
        summary.total_active = summary.total_active.saturating_add(amount);
        self.storage.put_summary(summary.clone()).await?;

        info!(
            user = %user_id,
            festival = %festival_id,
            date = %date,
            amount = amount.value(),
            active_after = summary.total_active.value(),
            "✅ Points activated"
        );
        Ok(summary)
    }

    /// Move points from active to consumed.
    pub async fn consume(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        date: &str,
        amount: PointAmount,
    ) -> Result<UserDailySummary> {
        let mut summary = self.get_or_create(user_id, festival_id, date).await?;

        summary.total_active = summary.total_active.checked_sub(amount).ok_or_else(|| {
            RewardError::LedgerInvariantViolation(format!(
                "consumption of {} exceeds active balance {} for user {} on {}",
                amount, summary.total_active, user_id, date
            ))
        })?;
        summary.total_consumed = summary.total_consumed.saturating_add(amount);
        self.storage.put_summary(summary.clone()).await?;

        info!(
            user = %user_id,
            festival = %festival_id,
            date = %date,
            amount = amount.value(),
            consumed_after = summary.total_consumed.value(),
            "💸 Points consumed"
        );
        Ok(summary)
    }

    /// Credit directly into the active bucket, bypassing the daily cap.
    /// Used for prize payouts; earning paths go through
    /// `apply_pending_credit`.
    pub async fn credit_active(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        date: &str,
        amount: PointAmount,
    ) -> Result<UserDailySummary> {
        let mut summary = self.get_or_create(user_id, festival_id, date).await?;
        summary.total_active = summary.total_active.saturating_add(amount);
        self.storage.put_summary(summary.clone()).await?;

        info!(
            user = %user_id,
            festival = %festival_id,
            date = %date,
            amount = amount.value(),
            active_after = summary.total_active.value(),
            "🏆 Active points credited"
        );
        Ok(summary)
    }
}
