use async_trait::async_trait;
use cashup_types::{
    BinId, BinScan, Coupon, Festival, FestivalId, JackpotEntry, JackpotPool, JackpotWinner,
    PhotoId, PointAmount, Result, TrashBin, TrashPhoto, User, UserDailySummary, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Persistence boundary for the reward system.
///
/// Budget figures are always summed fresh from the photo and coupon rows;
/// backends must not keep cached aggregates that could drift from them.
#[async_trait]
pub trait RewardStorage: Send + Sync {
    async fn get_festival(&self, id: &FestivalId) -> Result<Option<Festival>>;
    async fn put_festival(&self, festival: Festival) -> Result<()>;
    async fn list_festivals(&self) -> Result<Vec<Festival>>;

    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;
    async fn put_user(&self, user: User) -> Result<()>;

    async fn get_bin(&self, festival_id: &FestivalId, code: &str) -> Result<Option<TrashBin>>;
    async fn put_bin(&self, bin: TrashBin) -> Result<()>;
    async fn list_bins(&self, festival_id: &FestivalId) -> Result<Vec<TrashBin>>;
    async fn count_bins(&self, festival_id: &FestivalId) -> Result<usize>;

    async fn get_summary(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        date: &str,
    ) -> Result<Option<UserDailySummary>>;
    async fn put_summary(&self, summary: UserDailySummary) -> Result<()>;

    async fn insert_photo(&self, photo: TrashPhoto) -> Result<()>;
    /// Newest first, across every festival; limited to `limit` rows.
    async fn recent_photos(&self, user_id: &UserId, limit: usize) -> Result<Vec<TrashPhoto>>;
    /// Submissions by the user at or after `since`, across every festival.
    async fn count_photos_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<usize>;
    /// Pending photos submitted at or after `cutoff`, oldest first.
    async fn pending_photos_in_window(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TrashPhoto>>;
    async fn mark_photos_active(&self, ids: &[PhotoId]) -> Result<()>;
    /// Newest first, one user within one festival.
    async fn list_photos(&self, user_id: &UserId, festival_id: &FestivalId)
        -> Result<Vec<TrashPhoto>>;
    /// Points across all photo rows of the festival, any status.
    async fn sum_photo_points(&self, festival_id: &FestivalId) -> Result<PointAmount>;
    /// `(pending, active)` point totals for the festival.
    async fn photo_point_totals(&self, festival_id: &FestivalId)
        -> Result<(PointAmount, PointAmount)>;
    async fn count_distinct_submitters(&self, festival_id: &FestivalId) -> Result<usize>;

    async fn insert_coupon(&self, coupon: Coupon) -> Result<()>;
    /// Newest first, one user within one festival.
    async fn list_coupons(&self, user_id: &UserId, festival_id: &FestivalId) -> Result<Vec<Coupon>>;
    async fn sum_coupon_amounts(&self, festival_id: &FestivalId) -> Result<PointAmount>;
    async fn coupon_code_exists(&self, code: &str) -> Result<bool>;

    async fn get_pool(&self, festival_id: &FestivalId) -> Result<Option<JackpotPool>>;
    async fn put_pool(&self, pool: JackpotPool) -> Result<()>;
    async fn get_entry(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        week_key: &str,
    ) -> Result<Option<JackpotEntry>>;
    async fn put_entry(&self, entry: JackpotEntry) -> Result<()>;
    async fn entries_for_week(
        &self,
        festival_id: &FestivalId,
        week_key: &str,
    ) -> Result<Vec<JackpotEntry>>;
    async fn append_winner(&self, winner: JackpotWinner) -> Result<()>;

    async fn append_bin_scan(&self, scan: BinScan) -> Result<()>;
    async fn bin_scan_counts(&self, festival_id: &FestivalId) -> Result<HashMap<BinId, u64>>;

    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;
}
