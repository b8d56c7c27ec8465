use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Upper bound accepted for the concurrency ceiling.
pub const MAX_CONCURRENCY_CEILING: usize = 1024;

/// Title normalization switches used by the deduplicator.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DedupNormalization {
    pub strip_punctuation: bool,
    pub lowercase: bool,
    pub collapse_whitespace: bool,
}

impl Default for DedupNormalization {
    fn default() -> Self {
        Self {
            strip_punctuation: true,
            lowercase: true,
            collapse_whitespace: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct GenerationConfig {
    /// `None` or `Some(0)` means no ceiling.
    #[validate(range(max = 1024))]
    pub max_concurrent_requests: Option<usize>,
    #[validate(range(min = 1, max = 10))]
    pub retry_attempts: u32,
    #[validate(range(max = 300))]
    pub retry_delay_secs: u64,
    pub enable_deduplication: bool,
    pub dedup: DedupNormalization,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: None,
            retry_attempts: 3,
            retry_delay_secs: 2,
            enable_deduplication: true,
            dedup: DedupNormalization::default(),
        }
    }
}

impl GenerationConfig {
    pub fn concurrency_ceiling(&self) -> Option<usize> {
        self.max_concurrent_requests.filter(|limit| *limit > 0)
    }

    /// Linear back-off: the n-th retry waits n times the base delay.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.retry_delay_secs.saturating_mul(u64::from(attempt)))
    }
}
