use async_trait::async_trait;
use cashup_types::DetectionSummary;

/// External trash-detection model. Purely advisory: its output is stored
/// on the photo record and never gates acceptance, and an unavailable or
/// failing classifier simply yields no summary.
#[async_trait]
pub trait TrashClassifier: Send + Sync {
    async fn analyze(&self, bytes: &[u8]) -> Option<DetectionSummary>;
}

/// Classifier stand-in that detects nothing.
pub struct NullClassifier;

#[async_trait]
impl TrashClassifier for NullClassifier {
    async fn analyze(&self, _bytes: &[u8]) -> Option<DetectionSummary> {
        None
    }
}
