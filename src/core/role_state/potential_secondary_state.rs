use crate::utils::time::now_ns;
use crate::LearnerStatus;

/// State a replica carries while catching up as a learner.
#[derive(Debug)]
pub struct PotentialSecondaryState {
    pub learning_status: LearnerStatus,

    /// Bumped each time a learning round restarts, so stale round
    /// completions can be told apart from the current one.
    pub learning_version: u64,

    pub learning_start_ts_ns: u64,
}

impl PotentialSecondaryState {
    pub fn new() -> Self {
        Self {
            learning_status: LearnerStatus::LearningWithoutPrepare,
            learning_version: 0,
            learning_start_ts_ns: now_ns(),
        }
    }

    pub fn is_cleaned(&self) -> bool {
        matches!(
            self.learning_status,
            LearnerStatus::LearningSucceeded | LearnerStatus::LearningFailed
        )
    }

    pub fn cleanup(&mut self) {
        if !self.is_cleaned() {
            self.learning_status = LearnerStatus::LearningFailed;
        }
    }
}

impl Default for PotentialSecondaryState {
    fn default() -> Self {
        Self::new()
    }
}
