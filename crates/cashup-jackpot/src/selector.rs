use rand::Rng;

/// Picks a winning index from entry weights. Injectable so draws are
/// deterministic under test.
pub trait WinnerSelector: Send + Sync {
    /// Returns the index of the winning entry, or `None` when no entry
    /// carries positive weight.
    fn pick(&self, weights: &[u64]) -> Option<usize>;
}

pub struct WeightedRandomSelector;

impl WinnerSelector for WeightedRandomSelector {
    fn pick(&self, weights: &[u64]) -> Option<usize> {
        let total: u64 = weights.iter().sum();
        if total == 0 {
            return None;
        }

        let mut rng = rand::thread_rng();
        let mut roll = rng.gen_range(0..total);
        for (idx, &weight) in weights.iter().enumerate() {
            if roll < weight {
                return Some(idx);
            }
            roll -= weight;
        }
        None
    }
}
