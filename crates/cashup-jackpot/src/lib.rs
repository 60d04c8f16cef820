pub mod selector;

pub use selector::{WeightedRandomSelector, WinnerSelector};

use cashup_ledger::{DailySummaryLedger, RewardStorage};
use cashup_types::{
    FestivalId, JackpotEntry, JackpotPool, JackpotWinner, PointAmount, Result, RewardError, UserId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackpotConfig {
    pub seed_amount: PointAmount,
    pub target_amount: PointAmount,
    pub start_percent: f64,
    pub contribution_rate: f64,
}

impl Default for JackpotConfig {
    fn default() -> Self {
        Self {
            seed_amount: PointAmount::new(10_000),
            target_amount: PointAmount::new(100_000),
            start_percent: 0.78,
            contribution_rate: 0.1,
        }
    }
}

/// Read-only view of a festival's pool.
#[derive(Debug, Clone)]
pub struct JackpotStatus {
    pub festival_id: FestivalId,
    pub current_amount: PointAmount,
    pub last_winner_id: Option<UserId>,
    pub last_draw_date: Option<chrono::DateTime<Utc>>,
}

pub struct JackpotEngine {
    storage: Arc<dyn RewardStorage>,
    ledger: Arc<DailySummaryLedger>,
    config: JackpotConfig,
    selector: Arc<dyn WinnerSelector>,
}

impl JackpotEngine {
    pub fn new(
        storage: Arc<dyn RewardStorage>,
        ledger: Arc<DailySummaryLedger>,
        config: JackpotConfig,
    ) -> Self {
        Self::with_selector(storage, ledger, config, Arc::new(WeightedRandomSelector))
    }

    pub fn with_selector(
        storage: Arc<dyn RewardStorage>,
        ledger: Arc<DailySummaryLedger>,
        config: JackpotConfig,
        selector: Arc<dyn WinnerSelector>,
    ) -> Self {
        Self {
            storage,
            ledger,
            config,
            selector,
        }
    }

    /// Fetch the festival's pool, creating and priming it on first touch.
    /// Priming happens exactly once; later calls return the stored pool
    /// untouched.
    pub async fn ensure_pool(&self, festival_id: &FestivalId) -> Result<JackpotPool> {
        if let Some(pool) = self.storage.get_pool(festival_id).await? {
            return Ok(pool);
        }

        let primed = self
            .config
            .target_amount
            .scaled_by(self.config.start_percent)
            .max(self.config.seed_amount);
        let pool = JackpotPool {
            festival_id: festival_id.clone(),
            current_amount: primed,
            seed_amount: self.config.seed_amount,
            contribution_rate: self.config.contribution_rate,
            last_winner_id: None,
            last_draw_date: None,
        };
        self.storage.put_pool(pool.clone()).await?;

        info!(
            festival = %festival_id,
            primed = primed.value(),
            seed = self.config.seed_amount.value(),
            "🎰 Jackpot pool primed"
        );
        Ok(pool)
    }

    /// Route a share of freshly earned points into the pool, using the
    /// rate stored on the pool itself. Returns the contributed amount.
    pub async fn contribute(
        &self,
        festival_id: &FestivalId,
        points: PointAmount,
    ) -> Result<PointAmount> {
        let mut pool = self.ensure_pool(festival_id).await?;
        let share = points.scaled_by(pool.contribution_rate);
        if share.is_zero() {
            return Ok(PointAmount::ZERO);
        }

        pool.current_amount = pool.current_amount.saturating_add(share);
        self.storage.put_pool(pool.clone()).await?;

        info!(
            festival = %festival_id,
            contribution = share.value(),
            pool_after = pool.current_amount.value(),
            "🎰 Jackpot contribution"
        );
        Ok(share)
    }

    /// Grant the user one more raffle entry for the given ISO week.
    pub async fn record_entry(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        week_key: &str,
    ) -> Result<JackpotEntry> {
        let entry = match self.storage.get_entry(user_id, festival_id, week_key).await? {
            Some(mut entry) => {
                entry.entry_count += 1;
                entry
            }
            None => JackpotEntry {
                user_id: user_id.clone(),
                festival_id: festival_id.clone(),
                week_key: week_key.to_string(),
                entry_count: 1,
            },
        };
        self.storage.put_entry(entry.clone()).await?;
        Ok(entry)
    }

    /// Draw the week's winner inside one storage transaction: weighted
    /// selection over entry counts, prize credited straight into the
    /// winner's active balance for `date_key`, pool reset to seed.
    pub async fn draw(
        &self,
        festival_id: &FestivalId,
        week_key: &str,
        date_key: &str,
    ) -> Result<JackpotWinner> {
        self.storage.begin_transaction().await?;

        let result = self.draw_inner(festival_id, week_key, date_key).await;
        match result {
            Ok(winner) => {
                self.storage.commit_transaction().await?;
                info!(
                    festival = %festival_id,
                    week = %week_key,
                    winner = %winner.user_id,
                    amount = winner.amount.value(),
                    "🏆 Jackpot drawn"
                );
                Ok(winner)
            }
            Err(e) => {
                warn!(
                    festival = %festival_id,
                    week = %week_key,
                    error = %e,
                    "Jackpot draw failed, rolling back"
                );
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn draw_inner(
        &self,
        festival_id: &FestivalId,
        week_key: &str,
        date_key: &str,
    ) -> Result<JackpotWinner> {
        let mut pool = self
            .storage
            .get_pool(festival_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("jackpot pool for {}", festival_id)))?;

        let entries = self.storage.entries_for_week(festival_id, week_key).await?;
        if entries.is_empty() {
            return Err(RewardError::NoParticipants(week_key.to_string()));
        }

        let weights: Vec<u64> = entries.iter().map(|e| e.entry_count).collect();
        let idx = self
            .selector
            .pick(&weights)
            .ok_or_else(|| RewardError::NoParticipants(week_key.to_string()))?;
        let winner_entry = &entries[idx];

        let prize = pool.current_amount;
        self.ledger
            .credit_active(&winner_entry.user_id, festival_id, date_key, prize)
            .await?;

        let now = Utc::now();
        let winner = JackpotWinner {
            user_id: winner_entry.user_id.clone(),
            festival_id: festival_id.clone(),
            week_key: week_key.to_string(),
            amount: prize,
            drawn_at: now,
        };
        self.storage.append_winner(winner.clone()).await?;

        pool.current_amount = pool.seed_amount;
        pool.last_winner_id = Some(winner_entry.user_id.clone());
        pool.last_draw_date = Some(now);
        self.storage.put_pool(pool).await?;

        Ok(winner)
    }

    /// Read-only status. An absent pool reports zero; reads never prime.
    pub async fn status(&self, festival_id: &FestivalId) -> Result<JackpotStatus> {
        let pool = self.storage.get_pool(festival_id).await?;
        Ok(match pool {
            Some(pool) => JackpotStatus {
                festival_id: festival_id.clone(),
                current_amount: pool.current_amount,
                last_winner_id: pool.last_winner_id,
                last_draw_date: pool.last_draw_date,
            },
            None => JackpotStatus {
                festival_id: festival_id.clone(),
                current_amount: PointAmount::ZERO,
                last_winner_id: None,
                last_draw_date: None,
            },
        })
    }
}
