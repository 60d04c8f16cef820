pub mod activation;
pub mod admin;
pub mod bins;
pub mod classifier;
pub mod config;
pub mod coupon;
pub mod geo;
pub mod locks;
pub mod media;
pub mod submission;

pub use activation::{ActivationResult, BinActivationEngine};
pub use admin::{FestivalAdmin, FestivalOverview, FestivalSpec};
pub use classifier::{NullClassifier, TrashClassifier};
pub use config::EngineConfig;
pub use coupon::CouponDebitEngine;
pub use locks::FestivalLocks;
pub use media::{MemoryPhotoStore, PhotoStore};
pub use submission::{SubmissionOutcome, SubmissionPipeline};

use cashup_jackpot::{JackpotEngine, WeightedRandomSelector, WinnerSelector};
use cashup_ledger::{DailySummaryLedger, RewardStorage};
use cashup_types::{
    local_date_key, local_iso_week_key, Coupon, Festival, FestivalId, JackpotWinner, PointAmount,
    Result, RewardError, TrashBin, TrashPhoto, User, UserDailySummary, UserId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Jackpot status enriched with the winner's display name for clients.
#[derive(Debug, Clone)]
pub struct JackpotStatusView {
    pub festival_id: FestivalId,
    pub current_amount: PointAmount,
    pub last_winner_name: Option<String>,
    pub last_draw_date: Option<DateTime<Utc>>,
}

/// Top-level entry point wiring storage, ledger, jackpot and the three
/// operation engines together. Every owner-scoped operation verifies the
/// acting user is the user whose data is touched.
pub struct RewardEngine {
    pub storage: Arc<dyn RewardStorage>,
    pub ledger: Arc<DailySummaryLedger>,
    pub jackpot: Arc<JackpotEngine>,
    pub submissions: SubmissionPipeline,
    pub activation: BinActivationEngine,
    pub coupons: CouponDebitEngine,
    pub admin: FestivalAdmin,
    locks: Arc<FestivalLocks>,
    config: Arc<EngineConfig>,
}

impl RewardEngine {
    pub fn new(
        storage: Arc<dyn RewardStorage>,
        photos: Arc<dyn PhotoStore>,
        classifier: Arc<dyn TrashClassifier>,
        config: EngineConfig,
    ) -> Self {
        Self::with_selector(
            storage,
            photos,
            classifier,
            config,
            Arc::new(WeightedRandomSelector),
        )
    }

    pub fn with_selector(
        storage: Arc<dyn RewardStorage>,
        photos: Arc<dyn PhotoStore>,
        classifier: Arc<dyn TrashClassifier>,
        config: EngineConfig,
        selector: Arc<dyn WinnerSelector>,
    ) -> Self {
        let config = Arc::new(config);
        let ledger = Arc::new(DailySummaryLedger::new(storage.clone()));
        let jackpot = Arc::new(JackpotEngine::with_selector(
            storage.clone(),
            ledger.clone(),
            config.jackpot.clone(),
            selector,
        ));
        let locks = Arc::new(FestivalLocks::new());

        let submissions = SubmissionPipeline::new(
            storage.clone(),
            ledger.clone(),
            jackpot.clone(),
            photos,
            classifier,
            locks.clone(),
            config.clone(),
        );
        let activation = BinActivationEngine::new(
            storage.clone(),
            ledger.clone(),
            locks.clone(),
            config.clone(),
        );
        let coupons = CouponDebitEngine::new(
            storage.clone(),
            ledger.clone(),
            locks.clone(),
            config.clone(),
        );
        let admin = FestivalAdmin::new(storage.clone(), ledger.clone());

        Self {
            storage,
            ledger,
            jackpot,
            submissions,
            activation,
            coupons,
            admin,
            locks,
            config,
        }
    }

    fn ensure_owner(acting: &UserId, claimed: &UserId) -> Result<()> {
        if acting != claimed {
            return Err(RewardError::Forbidden(format!(
                "user {} cannot act for user {}",
                acting, claimed
            )));
        }
        Ok(())
    }

    fn resolve_festival(&self, festival_id: Option<FestivalId>) -> Result<FestivalId> {
        festival_id
            .or_else(|| self.config.default_festival_id.clone())
            .ok_or_else(|| {
                RewardError::InvalidRequest(
                    "no festival id given and no default configured".to_string(),
                )
            })
    }

    pub async fn submit_photo(
        &self,
        acting: &UserId,
        claimed: &UserId,
        festival_id: Option<FestivalId>,
        bytes: &[u8],
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<SubmissionOutcome> {
        Self::ensure_owner(acting, claimed)?;
        let festival_id = self.resolve_festival(festival_id)?;
        self.submissions
            .submit(claimed, &festival_id, bytes, lat, lng)
            .await
    }

    pub async fn activate_by_bin_scan(
        &self,
        acting: &UserId,
        claimed: &UserId,
        festival_id: Option<FestivalId>,
        bin_code: &str,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<ActivationResult> {
        Self::ensure_owner(acting, claimed)?;
        let festival_id = self.resolve_festival(festival_id)?;
        self.activation
            .activate(claimed, &festival_id, bin_code, lat, lng)
            .await
    }

    pub async fn issue_coupon(
        &self,
        acting: &UserId,
        claimed: &UserId,
        festival_id: Option<FestivalId>,
        shop_name: &str,
        amount: PointAmount,
    ) -> Result<Coupon> {
        Self::ensure_owner(acting, claimed)?;
        let festival_id = self.resolve_festival(festival_id)?;
        self.coupons
            .debit(claimed, &festival_id, shop_name, amount)
            .await
    }

    /// The user's summary for the current festival-local day. Returns an
    /// all-zero summary when the user has no activity yet today.
    pub async fn get_daily_summary(
        &self,
        acting: &UserId,
        claimed: &UserId,
        festival_id: Option<FestivalId>,
    ) -> Result<UserDailySummary> {
        Self::ensure_owner(acting, claimed)?;
        let festival_id = self.resolve_festival(festival_id)?;
        self.storage
            .get_user(claimed)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("user {}", claimed)))?;

        let date = local_date_key(Utc::now(), self.config.local_offset());
        self.ledger.get_or_create(claimed, &festival_id, &date).await
    }

    pub async fn list_photos(
        &self,
        acting: &UserId,
        claimed: &UserId,
        festival_id: Option<FestivalId>,
    ) -> Result<Vec<TrashPhoto>> {
        Self::ensure_owner(acting, claimed)?;
        let festival_id = self.resolve_festival(festival_id)?;
        self.storage.list_photos(claimed, &festival_id).await
    }

    pub async fn list_coupons(
        &self,
        acting: &UserId,
        claimed: &UserId,
        festival_id: Option<FestivalId>,
    ) -> Result<Vec<Coupon>> {
        Self::ensure_owner(acting, claimed)?;
        let festival_id = self.resolve_festival(festival_id)?;
        self.storage.list_coupons(claimed, &festival_id).await
    }

    pub async fn get_jackpot_status(
        &self,
        festival_id: Option<FestivalId>,
    ) -> Result<JackpotStatusView> {
        let festival_id = self.resolve_festival(festival_id)?;
        let status = self.jackpot.status(&festival_id).await?;

        let last_winner_name = match &status.last_winner_id {
            Some(user_id) => self
                .storage
                .get_user(user_id)
                .await?
                .map(|user| user.display_name),
            None => None,
        };

        Ok(JackpotStatusView {
            festival_id: status.festival_id,
            current_amount: status.current_amount,
            last_winner_name,
            last_draw_date: status.last_draw_date,
        })
    }

    /// Draw this week's jackpot winner. Held under the festival lock so a
    /// draw never interleaves with a submission crediting the same pool.
    pub async fn draw_jackpot(&self, festival_id: Option<FestivalId>) -> Result<JackpotWinner> {
        let festival_id = self.resolve_festival(festival_id)?;
        let now = Utc::now();
        let offset = self.config.local_offset();
        let week = local_iso_week_key(now, offset);
        let date = local_date_key(now, offset);

        let _guard = self.locks.acquire(&festival_id).await;
        self.jackpot.draw(&festival_id, &week, &date).await
    }

    pub async fn create_festival(&self, spec: FestivalSpec) -> Result<Festival> {
        self.admin.create_festival(spec).await
    }

    pub async fn register_user(&self, display_name: &str) -> Result<User> {
        self.admin.register_user(display_name).await
    }

    pub async fn generate_bins(
        &self,
        festival_id: Option<FestivalId>,
        count: usize,
    ) -> Result<Vec<TrashBin>> {
        let festival_id = self.resolve_festival(festival_id)?;
        self.admin.generate_bins(&festival_id, count).await
    }

    pub async fn festival_overview(
        &self,
        festival_id: Option<FestivalId>,
    ) -> Result<FestivalOverview> {
        let festival_id = self.resolve_festival(festival_id)?;
        self.admin.overview(&festival_id).await
    }
}
