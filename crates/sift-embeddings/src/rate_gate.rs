//! Rolling-window admission control for rate-limited providers.
//!
//! Every call records `(timestamp, tokens)` in a window shared by all workers.
//! A call that would push the window past either ceiling sleeps until the
//! oldest entry ages out, then rechecks. Check and record happen under one
//! lock, so concurrent callers can never jointly exceed a ceiling.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// When a call was let through and how long it waited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub at: Instant,
    pub waited: Duration,
}

pub struct RateGate {
    max_requests: usize,
    max_tokens: u64,
    window: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<VecDeque<(Instant, u32)>>,
}

impl RateGate {
    pub fn new(max_requests: u32, max_tokens: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, max_tokens, window, Arc::new(SystemClock))
    }

    pub fn with_clock(
        max_requests: u32,
        max_tokens: u32,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            max_requests: (max_requests as usize).max(1),
            max_tokens: u64::from(max_tokens.max(1)),
            window,
            clock,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until a call costing `tokens` fits in the window, then record it.
    ///
    /// An item larger than the whole token budget is admitted alone once the
    /// window is empty.
    pub fn acquire(&self, tokens: u32) -> Admission {
        let mut waited = Duration::ZERO;
        loop {
            let wait = {
                let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
                let now = self.clock.now();
                while let Some((ts, _)) = entries.front() {
                    if now.saturating_duration_since(*ts) >= self.window {
                        entries.pop_front();
                    } else {
                        break;
                    }
                }

                let used: u64 = entries.iter().map(|(_, t)| u64::from(*t)).sum();
                let fits = entries.len() < self.max_requests
                    && used + u64::from(tokens) <= self.max_tokens;
                if fits || entries.is_empty() {
                    entries.push_back((now, tokens));
                    return Admission { at: now, waited };
                }

                match entries.front() {
                    Some((oldest, _)) => self
                        .window
                        .saturating_sub(now.saturating_duration_since(*oldest))
                        .max(Duration::from_millis(1)),
                    None => Duration::from_millis(1),
                }
            };
            debug!(wait_ms = wait.as_millis() as u64, tokens, "rate gate full, waiting");
            self.clock.sleep(wait);
            waited += wait;
        }
    }

    /// Calls currently counted in the window.
    pub fn in_window(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let now = self.clock.now();
        entries
            .iter()
            .filter(|(ts, _)| now.saturating_duration_since(*ts) < self.window)
            .count()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Token estimate from character count. Never below one.
pub fn estimate_tokens(text: &str, chars_per_token: usize) -> u32 {
    let chars = text.chars().count();
    let per = chars_per_token.max(1);
    let tokens = chars.div_ceil(per).max(1);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}
