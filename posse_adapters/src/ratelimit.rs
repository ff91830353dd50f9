use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-local, in-memory rate-limit ledgers, per spec §9 design note
/// "Global in-memory state": everything lives behind this object,
/// constructed once at startup and injected into the HTTP handlers, with
/// a `clear_all` hook so tests don't leak state between cases.
#[derive(Default)]
pub struct RateLimiter {
    per_ip: Mutex<HashMap<String, VecDeque<Instant>>>,
    discovery_cooldowns: Mutex<HashMap<String, Instant>>,
    discovery_global: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` iff `ip` has made fewer than `limit_per_minute` requests in
    /// the trailing 60s window; records this attempt either way? No —
    /// only records when allowed, so a client that is currently blocked
    /// doesn't get to keep resetting its own window by retrying.
    pub fn allow_request(&self, ip: &str, limit_per_minute: u32) -> bool {
        let mut ledger = self.per_ip.lock().expect("rate limiter mutex poisoned");
        let window = ledger.entry(ip.to_owned()).or_default();
        prune(window, Duration::from_secs(60));
        if window.len() >= limit_per_minute as usize {
            return false;
        }
        window.push_back(Instant::now());
        true
    }

    /// Discovery is gated by two independent limits: a per-post cooldown
    /// (don't re-run discovery for the same post too often) and a global
    /// rate limit (don't hammer every platform's search/timeline endpoint
    /// across all posts at once).
    pub fn allow_discovery(&self, post_id: &str, cooldown_seconds: i64, global_limit_per_minute: u32) -> bool {
        let now = Instant::now();
        {
            let mut cooldowns = self.discovery_cooldowns.lock().expect("rate limiter mutex poisoned");
            if let Some(last) = cooldowns.get(post_id) {
                if now.duration_since(*last) < Duration::from_secs(cooldown_seconds.max(0) as u64) {
                    return false;
                }
            }
        }
        {
            let mut global = self.discovery_global.lock().expect("rate limiter mutex poisoned");
            prune(&mut global, Duration::from_secs(60));
            if global.len() >= global_limit_per_minute as usize {
                return false;
            }
            global.push_back(now);
        }
        self.discovery_cooldowns
            .lock()
            .expect("rate limiter mutex poisoned")
            .insert(post_id.to_owned(), now);
        true
    }

    /// Test hook (spec §9): drops every ledger so cases don't leak state.
    pub fn clear_all(&self) {
        self.per_ip.lock().expect("rate limiter mutex poisoned").clear();
        self.discovery_cooldowns.lock().expect("rate limiter mutex poisoned").clear();
        self.discovery_global.lock().expect("rate limiter mutex poisoned").clear();
    }
}

fn prune(window: &mut VecDeque<Instant>, max_age: Duration) {
    let now = Instant::now();
    while let Some(front) = window.front() {
        if now.duration_since(*front) > max_age {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_request_enforces_limit_then_recovers_on_clear() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.allow_request("1.2.3.4", 3));
        }
        assert!(!limiter.allow_request("1.2.3.4", 3));
        limiter.clear_all();
        assert!(limiter.allow_request("1.2.3.4", 3));
    }

    #[test]
    fn test_allow_request_scopes_by_ip() {
        let limiter = RateLimiter::new();
        assert!(limiter.allow_request("1.1.1.1", 1));
        assert!(!limiter.allow_request("1.1.1.1", 1));
        assert!(limiter.allow_request("2.2.2.2", 1));
    }

    #[test]
    fn test_allow_discovery_respects_per_post_cooldown() {
        let limiter = RateLimiter::new();
        assert!(limiter.allow_discovery("post1", 300, 10));
        assert!(!limiter.allow_discovery("post1", 300, 10));
        assert!(limiter.allow_discovery("post2", 300, 10));
    }

    #[test]
    fn test_allow_discovery_respects_global_limit() {
        let limiter = RateLimiter::new();
        for i in 0..5 {
            assert!(limiter.allow_discovery(&format!("post{i}"), 0, 5));
        }
        assert!(!limiter.allow_discovery("post-extra", 0, 5));
    }
}
