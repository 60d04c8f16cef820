use crate::classifier::TrashClassifier;
use crate::config::EngineConfig;
use crate::geo;
use crate::locks::FestivalLocks;
use crate::media::PhotoStore;
use cashup_jackpot::JackpotEngine;
use cashup_ledger::{DailySummaryLedger, RewardStorage};
use cashup_phash::PerceptualHash;
use cashup_types::{
    local_date_key, local_iso_week_key, Festival, FestivalId, PhotoId, PhotoStatus, Result,
    RewardError, TrashPhoto, UserDailySummary, UserId,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub photo: TrashPhoto,
    pub summary: UserDailySummary,
}

/// Orchestrates one photo upload: geofence, rate limit, duplicate scan,
/// cap and budget gates, then the transactional record creation with its
/// jackpot side effects. Every gate failure aborts the whole operation,
/// and bytes already written to the photo store are deleted on any
/// failure past that point.
pub struct SubmissionPipeline {
    storage: Arc<dyn RewardStorage>,
    ledger: Arc<DailySummaryLedger>,
    jackpot: Arc<JackpotEngine>,
    photos: Arc<dyn PhotoStore>,
    classifier: Arc<dyn TrashClassifier>,
    locks: Arc<FestivalLocks>,
    config: Arc<EngineConfig>,
}

impl SubmissionPipeline {
    pub fn new(
        storage: Arc<dyn RewardStorage>,
        ledger: Arc<DailySummaryLedger>,
        jackpot: Arc<JackpotEngine>,
        photos: Arc<dyn PhotoStore>,
        classifier: Arc<dyn TrashClassifier>,
        locks: Arc<FestivalLocks>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            storage,
            ledger,
            jackpot,
            photos,
            classifier,
            locks,
            config,
        }
    }

    pub async fn submit(
        &self,
        user_id: &UserId,
        festival_id: &FestivalId,
        bytes: &[u8],
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<SubmissionOutcome> {
        let festival = self
            .storage
            .get_festival(festival_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("festival {}", festival_id)))?;
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("user {}", user_id)))?;

        geo::check_geofence(&festival, lat, lng)?;

        let now = Utc::now();
        self.check_rate(user_id, now).await?;

        // Bytes land in object storage before hashing, matching upload
        // order in production; every later failure must clean them up.
        let storage_ref = self.photos.put(bytes).await?;
        match self
            .submit_stored(user_id, &festival, &storage_ref, bytes, now)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(cleanup) = self.photos.delete_if_exists(&storage_ref).await {
                    warn!(
                        storage_ref = %storage_ref,
                        error = %cleanup,
                        "Failed to clean up stored photo after rejected submission"
                    );
                }
                Err(e)
            }
        }
    }

    async fn check_rate(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<()> {
        let since = now - Duration::seconds(self.config.rate_window_secs);
        let recent = self.storage.count_photos_since(user_id, since).await?;
        debug!(
            user = %user_id,
            recent = recent,
            window_secs = self.config.rate_window_secs,
            "Rate gate"
        );
        if recent >= self.config.max_submissions_per_minute {
            return Err(RewardError::RateLimited(format!(
                "{} submissions in the last {}s",
                recent, self.config.rate_window_secs
            )));
        }
        Ok(())
    }

    async fn check_duplicate(&self, user_id: &UserId, hash: &PerceptualHash) -> Result<()> {
        let recent = self
            .storage
            .recent_photos(user_id, self.config.dedup_window)
            .await?;
        for photo in &recent {
            let dist = cashup_phash::distance(hash, &photo.hash);
            if dist <= self.config.dedup_max_distance {
                warn!(
                    user = %user_id,
                    matched_photo = %photo.id,
                    distance = dist,
                    "🚫 Near-duplicate submission rejected"
                );
                return Err(RewardError::DuplicateImage {
                    photo_id: photo.id.to_string(),
                    distance: dist,
                });
            }
        }
        Ok(())
    }

    async fn submit_stored(
        &self,
        user_id: &UserId,
        festival: &Festival,
        storage_ref: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome> {
        let hash = PerceptualHash::compute(bytes)?;
        self.check_duplicate(user_id, &hash).await?;

        let detection = self.classifier.analyze(bytes).await;

        let offset = self.config.local_offset();
        let date = local_date_key(now, offset);
        let week = local_iso_week_key(now, offset);
        let points = festival.per_photo_point;

        let _guard = self.locks.acquire(&festival.id).await;
        self.storage.begin_transaction().await?;

        let result = async {
            let summary = self
                .ledger
                .get_or_create(user_id, &festival.id, &date)
                .await?;
            let day_total = summary.total().saturating_add(points);
            if day_total > festival.per_user_daily_cap {
                return Err(RewardError::CapExceeded(format!(
                    "user {} at {} of {} for {}",
                    user_id,
                    summary.total(),
                    festival.per_user_daily_cap,
                    date
                )));
            }

            self.ledger.reserve_budget(festival, points).await?;

            let photo = TrashPhoto {
                id: PhotoId::generate(
                    user_id,
                    &festival.id,
                    now.timestamp_nanos_opt().unwrap_or(0),
                ),
                user_id: user_id.clone(),
                festival_id: festival.id.clone(),
                storage_ref: storage_ref.to_string(),
                hash: hash.to_hex(),
                status: PhotoStatus::Pending,
                points,
                detection,
                created_at: now,
            };
            self.storage.insert_photo(photo.clone()).await?;

            let summary = self
                .ledger
                .apply_pending_credit(festival, user_id, &date, points)
                .await?;

            self.jackpot.ensure_pool(&festival.id).await?;
            self.jackpot.contribute(&festival.id, points).await?;
            self.jackpot
                .record_entry(user_id, &festival.id, &week)
                .await?;

            Ok((photo, summary))
        }
        .await;

        match result {
            Ok((photo, summary)) => {
                self.storage.commit_transaction().await?;
                info!(
                    user = %user_id,
                    festival = %festival.id,
                    photo = %photo.id,
                    points = points.value(),
                    pending_after = summary.total_pending.value(),
                    "📸 Photo submission accepted"
                );
                Ok(SubmissionOutcome { photo, summary })
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }
}
