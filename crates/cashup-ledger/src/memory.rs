use crate::storage::RewardStorage;
use async_trait::async_trait;
use cashup_types::{
    BinId, BinScan, Coupon, Festival, FestivalId, JackpotEntry, JackpotPool, JackpotWinner,
    PhotoId, PointAmount, Result, TrashBin, TrashPhoto, User, UserDailySummary, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

type SummaryKey = (UserId, FestivalId, String);
type EntryKey = (UserId, FestivalId, String);

#[derive(Debug, Clone, Default)]
struct MemoryState {
    festivals: HashMap<FestivalId, Festival>,
    users: HashMap<UserId, User>,
    bins: HashMap<(FestivalId, String), TrashBin>,
    summaries: HashMap<SummaryKey, UserDailySummary>,
    photos: Vec<TrashPhoto>,
    coupons: Vec<Coupon>,
    pools: HashMap<FestivalId, JackpotPool>,
    entries: HashMap<EntryKey, JackpotEntry>,
    winners: Vec<JackpotWinner>,
    bin_scans: Vec<BinScan>,
}

/// In-memory backend. Transactions snapshot the whole state on begin and
/// restore it on rollback.
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
    backup: Arc<RwLock<Option<MemoryState>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            backup: Arc::new(RwLock::new(None)),
        }
    }
}

#[async_trait]
impl RewardStorage for MemoryStorage {
    async fn get_festival(&self, id: &FestivalId) -> Result<Option<Festival>> {
        let state = self.state.read().await;
        Ok(state.festivals.get(id).cloned())
    }

    async fn put_festival(&self, festival: Festival) -> Result<()> {
        let mut state = self.state.write().await;
        state.festivals.insert(festival.id.clone(), festival);
        Ok(())
    }

    async fn list_festivals(&self) -> Result<Vec<Festival>> {
        let state = self.state.read().await;
        let mut festivals: Vec<Festival> = state.festivals.values().cloned().collect();
        festivals.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(festivals)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(id).cloned())
    }

    async fn put_user(&self, user: User) -> Result<()> {
        let mut state = self.state.write().await;
        state.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_bin(&self, festival_id: &FestivalId, code: &str) -> Result<Option<TrashBin>> {
        let state = self.state.read().await;
        Ok(state
            .bins
            .get(&(festival_id.clone(), code.to_string()))
            .cloned())
    }

    async fn put_bin(&self, bin: TrashBin) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .bins
            .insert((bin.festival_id.clone(), bin.code.clone()), bin);
        Ok(())
    }

    async fn list_bins(&self, festival_id: &FestivalId) -> Result<Vec<TrashBin>> {
        let state = self.state.read().await;
        let mut bins: Vec<TrashBin> = state
            .bins
            .values()
            .filter(|b| &b.festival_id == festival_id)
            .cloned()
            .collect();
        bins.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(bins)
    }

    async fn count_bins(&self, festival_id: &FestivalId) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .bins
            .values()
            .filter(|b| &b.festival_id == festival_id)
            .count())
    }

    async fn get_summary(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        date: &str,
    ) -> Result<Option<UserDailySummary>> {
        let state = self.state.read().await;
        Ok(state
            .summaries
            .get(&(user_id.clone(), festival_id.clone(), date.to_string()))
            .cloned())
    }

    async fn put_summary(&self, summary: UserDailySummary) -> Result<()> {
        let mut state = self.state.write().await;
        state.summaries.insert(
            (
                summary.user_id.clone(),
                summary.festival_id.clone(),
                summary.date.clone(),
            ),
            summary,
        );
        Ok(())
    }

    async fn insert_photo(&self, photo: TrashPhoto) -> Result<()> {
        let mut state = self.state.write().await;
        state.photos.push(photo);
        Ok(())
    }

    async fn recent_photos(&self, user_id: &UserId, limit: usize) -> Result<Vec<TrashPhoto>> {
        let state = self.state.read().await;
        let mut photos: Vec<TrashPhoto> = state
            .photos
            .iter()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        photos.truncate(limit);
        Ok(photos)
    }

    async fn count_photos_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .photos
            .iter()
            .filter(|p| &p.user_id == user_id && p.created_at >= since)
            .count())
    }

    async fn pending_photos_in_window(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TrashPhoto>> {
        let state = self.state.read().await;
        let mut photos: Vec<TrashPhoto> = state
            .photos
            .iter()
            .filter(|p| {
                &p.user_id == user_id
                    && &p.festival_id == festival_id
                    && p.status == cashup_types::PhotoStatus::Pending
                    && p.created_at >= cutoff
            })
            .cloned()
            .collect();
        photos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(photos)
    }

    async fn mark_photos_active(&self, ids: &[PhotoId]) -> Result<()> {
        let mut state = self.state.write().await;
        let wanted: HashSet<&PhotoId> = ids.iter().collect();
        for photo in state.photos.iter_mut() {
            if wanted.contains(&photo.id) {
                photo.status = cashup_types::PhotoStatus::Active;
            }
        }
        Ok(())
    }

    async fn list_photos(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
    ) -> Result<Vec<TrashPhoto>> {
        let state = self.state.read().await;
        let mut photos: Vec<TrashPhoto> = state
            .photos
            .iter()
            .filter(|p| &p.user_id == user_id && &p.festival_id == festival_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(photos)
    }

    async fn sum_photo_points(&self, festival_id: &FestivalId) -> Result<PointAmount> {
        let state = self.state.read().await;
        Ok(state
            .photos
            .iter()
            .filter(|p| &p.festival_id == festival_id)
            .map(|p| p.points)
            .sum())
    }

    async fn photo_point_totals(
        &self,
        festival_id: &FestivalId,
    ) -> Result<(PointAmount, PointAmount)> {
        let state = self.state.read().await;
        let mut pending = PointAmount::ZERO;
        let mut active = PointAmount::ZERO;
        for photo in state.photos.iter().filter(|p| &p.festival_id == festival_id) {
            match photo.status {
                cashup_types::PhotoStatus::Pending => pending = pending.saturating_add(photo.points),
                cashup_types::PhotoStatus::Active => active = active.saturating_add(photo.points),
            }
        }
        Ok((pending, active))
    }

    async fn count_distinct_submitters(&self, festival_id: &FestivalId) -> Result<usize> {
        let state = self.state.read().await;
        let users: HashSet<&UserId> = state
            .photos
            .iter()
            .filter(|p| &p.festival_id == festival_id)
            .map(|p| &p.user_id)
            .collect();
        Ok(users.len())
    }

    async fn insert_coupon(&self, coupon: Coupon) -> Result<()> {
        let mut state = self.state.write().await;
        state.coupons.push(coupon);
        Ok(())
    }

    async fn list_coupons(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
    ) -> Result<Vec<Coupon>> {
        let state = self.state.read().await;
        let mut coupons: Vec<Coupon> = state
            .coupons
            .iter()
            .filter(|c| &c.user_id == user_id && &c.festival_id == festival_id)
            .cloned()
            .collect();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(coupons)
    }

    async fn sum_coupon_amounts(&self, festival_id: &FestivalId) -> Result<PointAmount> {
        let state = self.state.read().await;
        Ok(state
            .coupons
            .iter()
            .filter(|c| &c.festival_id == festival_id)
            .map(|c| c.amount)
            .sum())
    }

    async fn coupon_code_exists(&self, code: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.coupons.iter().any(|c| c.code == code))
    }

    async fn get_pool(&self, festival_id: &FestivalId) -> Result<Option<JackpotPool>> {
        let state = self.state.read().await;
        Ok(state.pools.get(festival_id).cloned())
    }

    async fn put_pool(&self, pool: JackpotPool) -> Result<()> {
        let mut state = self.state.write().await;
        state.pools.insert(pool.festival_id.clone(), pool);
        Ok(())
    }

    async fn get_entry(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        week_key: &str,
    ) -> Result<Option<JackpotEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(&(user_id.clone(), festival_id.clone(), week_key.to_string()))
            .cloned())
    }

    async fn put_entry(&self, entry: JackpotEntry) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.insert(
            (
                entry.user_id.clone(),
                entry.festival_id.clone(),
                entry.week_key.clone(),
            ),
            entry,
        );
        Ok(())
    }

    async fn entries_for_week(
        &self,
        festival_id: &FestivalId,
        week_key: &str,
    ) -> Result<Vec<JackpotEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<JackpotEntry> = state
            .entries
            .values()
            .filter(|e| &e.festival_id == festival_id && e.week_key == week_key)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(entries)
    }

    async fn append_winner(&self, winner: JackpotWinner) -> Result<()> {
        let mut state = self.state.write().await;
        state.winners.push(winner);
        Ok(())
    }

    async fn append_bin_scan(&self, scan: BinScan) -> Result<()> {
        let mut state = self.state.write().await;
        state.bin_scans.push(scan);
        Ok(())
    }

    async fn bin_scan_counts(&self, festival_id: &FestivalId) -> Result<HashMap<BinId, u64>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for scan in state.bin_scans.iter().filter(|s| &s.festival_id == festival_id) {
            *counts.entry(scan.bin_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn begin_transaction(&self) -> Result<()> {
        let state = self.state.read().await;
        let mut backup = self.backup.write().await;
        *backup = Some(state.clone());

        info!(
            photo_count = state.photos.len(),
            summary_count = state.summaries.len(),
            storage_type = "memory",
            "📝 Transaction began (snapshot created)"
        );
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut backup = self.backup.write().await;
        let had_backup = backup.is_some();
        *backup = None;

        if had_backup {
            info!(
                storage_type = "memory",
                "✅ Transaction committed (snapshot discarded)"
            );
        }
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut backup = self.backup.write().await;

        if let Some(snapshot) = backup.take() {
            let mut state = self.state.write().await;
            *state = snapshot;

            info!(
                photo_count = state.photos.len(),
                summary_count = state.summaries.len(),
                storage_type = "memory",
                "❌ Transaction rolled back (snapshot restored)"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashup_types::PhotoStatus;

    fn photo(id: &str, user: &str, festival: &str, at: DateTime<Utc>) -> TrashPhoto {
        TrashPhoto {
            id: PhotoId::new(id),
            user_id: UserId::new(user),
            festival_id: FestivalId::new(festival),
            storage_ref: format!("mem://{}", id),
            hash: "0000000000000000".to_string(),
            status: PhotoStatus::Pending,
            points: PointAmount::new(10),
            detection: None,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_recent_photos_cross_festival_newest_first() {
        let storage = MemoryStorage::new();
        let base = Utc::now();

        storage
            .insert_photo(photo("p1", "u1", "f1", base))
            .await
            .unwrap();
        storage
            .insert_photo(photo("p2", "u1", "f2", base + chrono::Duration::seconds(1)))
            .await
            .unwrap();
        storage
            .insert_photo(photo("p3", "u2", "f1", base + chrono::Duration::seconds(2)))
            .await
            .unwrap();

        let recent = storage.recent_photos(&UserId::new("u1"), 20).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, PhotoId::new("p2"));
        assert_eq!(recent[1].id, PhotoId::new("p1"));

        let limited = storage.recent_photos(&UserId::new("u1"), 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, PhotoId::new("p2"));
    }

    #[tokio::test]
    async fn test_pending_window_oldest_first() {
        let storage = MemoryStorage::new();
        let base = Utc::now();

        let mut old = photo("old", "u1", "f1", base - chrono::Duration::minutes(45));
        old.status = PhotoStatus::Pending;
        storage.insert_photo(old).await.unwrap();
        storage
            .insert_photo(photo("a", "u1", "f1", base - chrono::Duration::minutes(10)))
            .await
            .unwrap();
        storage
            .insert_photo(photo("b", "u1", "f1", base - chrono::Duration::minutes(5)))
            .await
            .unwrap();

        let cutoff = base - chrono::Duration::minutes(30);
        let window = storage
            .pending_photos_in_window(&UserId::new("u1"), &FestivalId::new("f1"), cutoff)
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].id, PhotoId::new("a"));
        assert_eq!(window[1].id, PhotoId::new("b"));
    }

    #[tokio::test]
    async fn test_mark_photos_active() {
        let storage = MemoryStorage::new();
        let base = Utc::now();
        storage.insert_photo(photo("a", "u1", "f1", base)).await.unwrap();
        storage.insert_photo(photo("b", "u1", "f1", base)).await.unwrap();

        storage
            .mark_photos_active(&[PhotoId::new("a")])
            .await
            .unwrap();

        let (pending, active) = storage
            .photo_point_totals(&FestivalId::new("f1"))
            .await
            .unwrap();
        assert_eq!(pending, PointAmount::new(10));
        assert_eq!(active, PointAmount::new(10));
    }

    #[tokio::test]
    async fn test_transaction_rollback_restores_state() {
        let storage = MemoryStorage::new();
        let base = Utc::now();
        storage.insert_photo(photo("a", "u1", "f1", base)).await.unwrap();

        storage.begin_transaction().await.unwrap();
        storage.insert_photo(photo("b", "u1", "f1", base)).await.unwrap();
        storage
            .mark_photos_active(&[PhotoId::new("a")])
            .await
            .unwrap();
        storage.rollback_transaction().await.unwrap();

        let photos = storage
            .list_photos(&UserId::new("u1"), &FestivalId::new("f1"))
            .await
            .unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].status, PhotoStatus::Pending);
    }

    #[tokio::test]
    async fn test_commit_discards_snapshot() {
        let storage = MemoryStorage::new();
        let base = Utc::now();

        storage.begin_transaction().await.unwrap();
        storage.insert_photo(photo("a", "u1", "f1", base)).await.unwrap();
        storage.commit_transaction().await.unwrap();

        // Rollback after commit is a no-op.
        storage.rollback_transaction().await.unwrap();
        let photos = storage
            .list_photos(&UserId::new("u1"), &FestivalId::new("f1"))
            .await
            .unwrap();
        assert_eq!(photos.len(), 1);
    }

    #[tokio::test]
    async fn test_budget_sums_are_fresh() {
        let storage = MemoryStorage::new();
        let base = Utc::now();
        storage.insert_photo(photo("a", "u1", "f1", base)).await.unwrap();
        storage
            .insert_coupon(Coupon {
                id: cashup_types::CouponId::new("c1"),
                user_id: UserId::new("u1"),
                festival_id: FestivalId::new("f1"),
                shop_name: "Noodle Stand".to_string(),
                amount: PointAmount::new(7),
                code: "HDFEST-7-000001".to_string(),
                status: cashup_types::CouponStatus::Issued,
                created_at: base,
            })
            .await
            .unwrap();

        let photos = storage.sum_photo_points(&FestivalId::new("f1")).await.unwrap();
        let coupons = storage
            .sum_coupon_amounts(&FestivalId::new("f1"))
            .await
            .unwrap();
        assert_eq!(photos, PointAmount::new(10));
        assert_eq!(coupons, PointAmount::new(7));
        assert!(storage.coupon_code_exists("HDFEST-7-000001").await.unwrap());
        assert!(!storage.coupon_code_exists("HDFEST-7-000002").await.unwrap());
    }
}
