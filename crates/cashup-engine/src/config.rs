use cashup_jackpot::JackpotConfig;
use cashup_types::FestivalId;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Festival used when a request names none.
    pub default_festival_id: Option<FestivalId>,
    /// How long a pending photo stays eligible for bin activation.
    pub pending_activation_minutes: i64,
    pub rate_window_secs: i64,
    /// Prior submissions allowed inside the rate window; the submission
    /// that would exceed this count is refused.
    pub max_submissions_per_minute: usize,
    /// How many of the user's most recent photos the dedup gate scans.
    pub dedup_window: usize,
    /// Hash distance at or below which a submission counts as a duplicate.
    pub dedup_max_distance: u32,
    /// Festival-local UTC offset in hours, for day and week keys.
    pub utc_offset_hours: i32,
    pub jackpot: JackpotConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_festival_id: None,
            pending_activation_minutes: 30,
            rate_window_secs: 60,
            max_submissions_per_minute: 4,
            dedup_window: 20,
            dedup_max_distance: 5,
            utc_offset_hours: 9,
            jackpot: JackpotConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn local_offset(&self) -> FixedOffset {
        let secs = self.utc_offset_hours.clamp(-23, 23) * 3600;
        FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
    }
}
