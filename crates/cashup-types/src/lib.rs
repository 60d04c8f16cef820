pub mod error;
pub mod id;
pub mod points;
pub mod records;
pub mod time;

pub use error::{Result, RewardError};
pub use id::{BinId, CouponId, FestivalId, PhotoId, UserId};
pub use points::PointAmount;
pub use records::{
    BinScan, Coupon, CouponStatus, DetectionSummary, Festival, Geofence, JackpotEntry,
    JackpotPool, JackpotWinner, PhotoStatus, TrashBin, TrashPhoto, User, UserDailySummary,
    DEFAULT_GEOFENCE_RADIUS_M,
};
pub use time::{local_date_key, local_iso_week_key};
