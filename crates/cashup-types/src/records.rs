use crate::id::{BinId, CouponId, FestivalId, PhotoId, UserId};
use crate::points::PointAmount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 1500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_meters: Option<f64>,
}

impl Geofence {
    pub fn radius(&self) -> f64 {
        self.radius_meters.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Festival {
    pub id: FestivalId,
    pub name: String,
    pub budget: PointAmount,
    pub per_user_daily_cap: PointAmount,
    pub per_photo_point: PointAmount,
    pub geofence: Option<Geofence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashBin {
    pub id: BinId,
    pub festival_id: FestivalId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One user's point balances for one festival-local day.
/// `date` is a `YYYY-MM-DD` key in the festival's local calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDailySummary {
    pub user_id: UserId,
    pub festival_id: FestivalId,
    pub date: String,
    pub total_pending: PointAmount,
    pub total_active: PointAmount,
    pub total_consumed: PointAmount,
}

impl UserDailySummary {
    pub fn empty(user_id: UserId, festival_id: FestivalId, date: String) -> Self {
        Self {
            user_id,
            festival_id,
            date,
            total_pending: PointAmount::ZERO,
            total_active: PointAmount::ZERO,
            total_consumed: PointAmount::ZERO,
        }
    }

    /// Lifetime earnings for the day regardless of state.
    pub fn total(&self) -> PointAmount {
        self.total_pending
            .saturating_add(self.total_active)
            .saturating_add(self.total_consumed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhotoStatus {
    Pending,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub has_trash: bool,
    pub trash_count: u32,
    pub max_confidence: f64,
    pub raw_detections: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashPhoto {
    pub id: PhotoId,
    pub user_id: UserId,
    pub festival_id: FestivalId,
    pub storage_ref: String,
    pub hash: String,
    pub status: PhotoStatus,
    pub points: PointAmount,
    pub detection: Option<DetectionSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    Issued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub user_id: UserId,
    pub festival_id: FestivalId,
    pub shop_name: String,
    pub amount: PointAmount,
    pub code: String,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackpotPool {
    pub festival_id: FestivalId,
    pub current_amount: PointAmount,
    pub seed_amount: PointAmount,
    pub contribution_rate: f64,
    pub last_winner_id: Option<UserId>,
    pub last_draw_date: Option<DateTime<Utc>>,
}

/// Weekly raffle weight. `week_key` is an ISO-week key (`YYYY-Www`)
/// in the festival's local calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackpotEntry {
    pub user_id: UserId,
    pub festival_id: FestivalId,
    pub week_key: String,
    pub entry_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackpotWinner {
    pub user_id: UserId,
    pub festival_id: FestivalId,
    pub week_key: String,
    pub amount: PointAmount,
    pub drawn_at: DateTime<Utc>,
}

/// Audit record for a bin-triggered activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinScan {
    pub festival_id: FestivalId,
    pub bin_id: BinId,
    pub user_id: UserId,
    pub scanned_at: DateTime<Utc>,
}
