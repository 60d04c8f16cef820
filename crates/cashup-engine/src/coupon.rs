use crate::config::EngineConfig;
use crate::locks::FestivalLocks;
use cashup_ledger::{DailySummaryLedger, RewardStorage};
use cashup_types::{
    local_date_key, Coupon, CouponId, CouponStatus, FestivalId, PointAmount, Result, RewardError,
    UserId,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Converts active points into consumed points by issuing a coupon.
/// Coupon amounts draw on the same festival budget as photo credits:
/// the budget tracks total value ever issued, not value outstanding.
pub struct CouponDebitEngine {
    storage: Arc<dyn RewardStorage>,
    ledger: Arc<DailySummaryLedger>,
    locks: Arc<FestivalLocks>,
    config: Arc<EngineConfig>,
}

impl CouponDebitEngine {
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

    pub async fn debit(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        shop_name: &str,
        amount: PointAmount,
    ) -> Result<Coupon> {
        if amount.is_zero() {
            return Err(RewardError::InvalidRequest(
                "coupon amount must be positive".to_string(),
            ));
        }

        let festival = self
            .storage
            .get_festival(festival_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("festival {}", festival_id)))?;
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("user {}", user_id)))?;

        let now = Utc::now();
        let date = local_date_key(now, self.config.local_offset());

        let _guard = self.locks.acquire(festival_id).await;
        self.storage.begin_transaction().await?;

        let result = async {
            let summary = self
                .ledger
                .get_or_create(user_id, festival_id, &date)
                .await?;
            if summary.total_active < amount {
                return Err(RewardError::InsufficientBalance {
                    available: summary.total_active.value(),
                    requested: amount.value(),
                });
            }

            self.ledger.reserve_budget(&festival, amount).await?;
            self.ledger.consume(user_id, festival_id, &date, amount).await?;

            let code = self.unique_code(amount, now.timestamp_nanos_opt().unwrap_or(0)).await?;
            let coupon = Coupon {
                id: CouponId::generate(user_id, festival_id, now.timestamp_nanos_opt().unwrap_or(0)),
                user_id: user_id.clone(),
                festival_id: festival_id.clone(),
                shop_name: shop_name.to_string(),
                amount,
                code,
                status: CouponStatus::Issued,
                created_at: now,
            };
            self.storage.insert_coupon(coupon.clone()).await?;
            Ok(coupon)
        }
        .await;

        match result {
            Ok(coupon) => {
                self.storage.commit_transaction().await?;
                info!(
                    user = %user_id,
                    festival = %festival_id,
                    shop = %coupon.shop_name,
                    amount = amount.value(),
                    code = %coupon.code,
                    "🎟 Coupon issued"
                );
                Ok(coupon)
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    /// Redemption code `HDFEST-{amount}-{6 digits}`, re-rolled until it
    /// does not collide with any stored coupon.
    async fn unique_code(&self, amount: PointAmount, nanos: i64) -> Result<String> {
        let mut suffix = (nanos % 1_000_000).unsigned_abs();
        loop {
            let code = format!("HDFEST-{}-{:06}", amount.value(), suffix);
            if !self.storage.coupon_code_exists(&code).await? {
                return Ok(code);
            }
            suffix = (suffix + 1) % 1_000_000;
        }
    }
}
