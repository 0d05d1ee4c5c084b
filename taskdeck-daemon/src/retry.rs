//! Backoff schedule for failed sync runs.

use std::time::Duration;

use taskdeck_core::SyncSettings;

/// Exponential backoff without jitter: retry `n` waits
/// `base_delay * 2^(n-1)`, capped at `max_delay`. At most `max_retries`
/// retries follow one failed run; after that the next scheduled tick is the
/// only trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SyncSettings::default())
    }
}

impl From<&SyncSettings> for RetryPolicy {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: settings.retry_base_delay(),
            max_delay: settings.retry_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), or `None` once the
    /// budget is spent.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }

    #[test]
    fn delays_double_until_capped() {
        let delays: Vec<_> = (1..=6).filter_map(|n| policy(6).delay_for(n)).collect();
        assert_eq!(
            delays,
            [2, 4, 8, 16, 30, 30].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn budget_is_respected() {
        let p = policy(2);
        assert!(p.delay_for(2).is_some());
        assert_eq!(p.delay_for(3), None);
        assert_eq!(p.delay_for(0), None);
    }

    #[test]
    fn huge_attempt_numbers_saturate_at_cap() {
        let p = policy(u32::MAX);
        assert_eq!(p.delay_for(200), Some(Duration::from_secs(30)));
    }

    #[test]
    fn defaults_follow_sync_settings() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 5);
        assert_eq!(p.base_delay, Duration::from_secs(2));
        assert_eq!(p.max_delay, Duration::from_secs(300));
    }
}
