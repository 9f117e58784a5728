//! Login failure limiting.
//!
//! Five failed logins for the same email within 15 minutes lock further
//! attempts until the oldest failure ages out. A successful login clears the
//! count. State is per process.

use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Mutex};

pub const MAX_LOGIN_FAILURES: usize = 5;
pub const FAILURE_WINDOW_MINUTES: i64 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision;
    fn record_failure(&self, key: &str, now: DateTime<Utc>);
    fn reset(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct FailureWindowLimiter {
    failures: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl FailureWindowLimiter {
    fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(FAILURE_WINDOW_MINUTES)
    }
}

impl RateLimiter for FailureWindowLimiter {
    fn check(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let Ok(mut failures) = self.failures.lock() else {
            return RateLimitDecision::Allowed;
        };
        let Some(times) = failures.get_mut(key) else {
            return RateLimitDecision::Allowed;
        };
        let start = Self::window_start(now);
        times.retain(|at| *at > start);
        if times.len() >= MAX_LOGIN_FAILURES {
            RateLimitDecision::Limited
        } else {
            RateLimitDecision::Allowed
        }
    }

    fn record_failure(&self, key: &str, now: DateTime<Utc>) {
        if let Ok(mut failures) = self.failures.lock() {
            let start = Self::window_start(now);
            let times = failures.entry(key.to_string()).or_default();
            times.retain(|at| *at > start);
            times.push(now);
        }
    }

    fn reset(&self, key: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, minute, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn fifth_failure_locks() {
        let limiter = FailureWindowLimiter::default();
        for minute in 0..4 {
            limiter.record_failure("ada@example.com", at(minute));
        }
        assert_eq!(limiter.check("ada@example.com", at(5)), RateLimitDecision::Allowed);
        limiter.record_failure("ada@example.com", at(5));
        assert_eq!(limiter.check("ada@example.com", at(6)), RateLimitDecision::Limited);
        assert_eq!(limiter.check("bob@example.com", at(6)), RateLimitDecision::Allowed);
    }

    #[test]
    fn old_failures_age_out() {
        let limiter = FailureWindowLimiter::default();
        for minute in 0..5 {
            limiter.record_failure("ada@example.com", at(minute));
        }
        assert_eq!(limiter.check("ada@example.com", at(14)), RateLimitDecision::Limited);
        assert_eq!(limiter.check("ada@example.com", at(16)), RateLimitDecision::Allowed);
    }

    #[test]
    fn reset_clears_failures() {
        let limiter = FailureWindowLimiter::default();
        for minute in 0..5 {
            limiter.record_failure("ada@example.com", at(minute));
        }
        limiter.reset("ada@example.com");
        assert_eq!(limiter.check("ada@example.com", at(6)), RateLimitDecision::Allowed);
    }
}
