//! Circuit breaker over flaky endpoints (C9): after enough consecutive
//! failures, an endpoint is blacklisted for a fixed window so further
//! requests fail fast instead of waiting out a full retry cycle against a
//! dead server (spec.md §4.7).
//!
//! [`Error::Timeout`], [`Error::BadAuthenticator`], and [`Error::Transport`]
//! count toward the failure threshold — spec.md §7 states plainly that
//! network I/O errors feed the blacklist counter. Local failures — encoding
//! errors, a full identifier pool, a misconfigured secret — say nothing
//! about the remote endpoint's health and must not trip the breaker
//! (spec.md §7 Open Question, resolved conservatively for that narrower
//! case).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Error;

struct Entry {
    fail_count: u32,
    blacklisted_until: Option<Instant>,
}

impl Entry {
    fn fresh() -> Self {
        Self {
            fail_count: 0,
            blacklisted_until: None,
        }
    }
}

/// Whether an [`Error`] counts toward an endpoint's failure tally.
pub fn counts_as_failure(err: &Error) -> bool {
    matches!(err, Error::Timeout | Error::BadAuthenticator | Error::Transport(_))
}

/// Per-endpoint failure counter and blacklist window.
pub struct Blacklist<Endpoint> {
    entries: Mutex<HashMap<Endpoint, Entry>>,
    fail_count_threshold: u32,
    blacklist_ttl: Duration,
}

impl<Endpoint: Eq + Hash + Clone> Blacklist<Endpoint> {
    pub fn new(fail_count_threshold: u32, blacklist_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fail_count_threshold,
            blacklist_ttl,
        }
    }

    /// Whether requests to `endpoint` should currently be refused outright.
    /// Lazily clears an expired blacklist window.
    pub fn is_blacklisted(&self, endpoint: &Endpoint) -> bool {
        let mut table = self.entries.lock().expect("blacklist mutex poisoned");
        match table.get_mut(endpoint) {
            Some(entry) => match entry.blacklisted_until {
                Some(until) if until > Instant::now() => true,
                Some(_) => {
                    entry.blacklisted_until = None;
                    entry.fail_count = 0;
                    false
                }
                None => false,
            },
            None => false,
        }
    }

    /// Record the outcome of a request. Only failures in
    /// [`counts_as_failure`] move the counter; anything else resets it, and
    /// a success clears the blacklist window too.
    pub fn record(&self, endpoint: &Endpoint, result: &Result<(), Error>) {
        let mut table = self.entries.lock().expect("blacklist mutex poisoned");
        match result {
            Ok(()) => {
                table.remove(endpoint);
            }
            Err(err) if counts_as_failure(err) => {
                let entry = table.entry(endpoint.clone()).or_insert_with(Entry::fresh);
                entry.fail_count += 1;
                if entry.fail_count >= self.fail_count_threshold && entry.blacklisted_until.is_none() {
                    entry.blacklisted_until = Some(Instant::now() + self.blacklist_ttl);
                }
            }
            Err(_) => {}
        }
    }
}
