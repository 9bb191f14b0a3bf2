// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Social Wallet

//! Fixed-window request limiting for the token endpoint.
//!
//! Tracks one counter per key (client id). The window resets lazily on the
//! first check after it elapses; stale entries are pruned when the map
//! grows past a threshold so abandoned clients don't accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default requests per window.
const DEFAULT_LIMIT: u32 = 60;

/// Default window length.
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Prune the map once it holds this many keys.
const CLEANUP_THRESHOLD: usize = 10_000;

/// In-process fixed-window limiter.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    state: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    limit: u32,
    window: Duration,
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW)
    }
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Record one request for `key`. Returns `false` when the key is over
    /// its limit for the current window.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panic mid-update; failing open keeps
            // the token endpoint available.
            Err(poisoned) => poisoned.into_inner(),
        };

        let entry = state.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }

        if entry.0 >= self.limit {
            return false;
        }
        entry.0 += 1;

        if state.len() > CLEANUP_THRESHOLD {
            let window = self.window;
            state.retain(|_, (_, started)| now.duration_since(*started) < window);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("client-1"));
        assert!(limiter.check("client-1"));
        assert!(limiter.check("client-1"));
        assert!(!limiter.check("client-1"));
        // Other keys are unaffected
        assert!(limiter.check("client-2"));
    }

    #[test]
    fn window_resets_after_elapse() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("client-1"));
        assert!(!limiter.check("client-1"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("client-1"));
    }
}
