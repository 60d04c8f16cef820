use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardError {
    #[error("Submission location outside festival geofence: {0}")]
    OutsideGeofence(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Duplicate image detected: distance {distance} from photo {photo_id}")]
    DuplicateImage { photo_id: String, distance: u32 },

    #[error("Daily cap exceeded: {0}")]
    CapExceeded(String),

    #[error("Festival budget exhausted: {0}")]
    BudgetExhausted(String),

    #[error("No pending points eligible for activation")]
    NothingToActivate,

    #[error("Insufficient active balance: have {available}, need {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    #[error("No jackpot participants for {0}")]
    NoParticipants(String),

    #[error("Ledger invariant violation: {0}")]
    LedgerInvariantViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RewardError {
    /// Stable machine-readable kind for API surfaces and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OutsideGeofence(_) => "outside_geofence",
            Self::RateLimited(_) => "rate_limited",
            Self::DuplicateImage { .. } => "duplicate_image",
            Self::CapExceeded(_) => "cap_exceeded",
            Self::BudgetExhausted(_) => "budget_exhausted",
            Self::NothingToActivate => "nothing_to_activate",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::NoParticipants(_) => "no_participants",
            Self::LedgerInvariantViolation(_) => "ledger_invariant_violation",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidImage(_) => "invalid_image",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Whether retrying the same request later could succeed without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::BudgetExhausted(_))
    }
}

impl From<serde_json::Error> for RewardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RewardError>;
