//! Read/write admission throttling.
//!
//! Each direction carries its own controller with two possible throttled
//! verdicts: delay (defer by a computed delay, the retry path lives outside
//! the core) and reject (answer busy immediately). Counting is per wall-clock
//! second; the delay band starts at half the QPS limit, the reject band at
//! the limit itself.

use std::time::Duration;

use crate::config::ThrottleOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleVerdict {
    NotThrottled,
    Delay(Duration),
    Reject,
}

pub struct ThrottlingController {
    options: ThrottleOptions,
    window_start_ms: u64,
    admitted_in_window: u64,
}

impl ThrottlingController {
    pub fn new(options: ThrottleOptions) -> Self {
        Self {
            options,
            window_start_ms: 0,
            admitted_in_window: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.options.enabled
    }

    /// Account one request at `now_ms` and return its admission verdict.
    pub fn verdict(
        &mut self,
        now_ms: u64,
    ) -> ThrottleVerdict {
        if !self.options.enabled || self.options.qps_limit == 0 {
            return ThrottleVerdict::NotThrottled;
        }

        if now_ms.saturating_sub(self.window_start_ms) >= 1000 {
            self.window_start_ms = now_ms - now_ms % 1000;
            self.admitted_in_window = 0;
        }

        self.admitted_in_window += 1;

        if self.admitted_in_window > self.options.qps_limit {
            return ThrottleVerdict::Reject;
        }
        if self.admitted_in_window * 2 > self.options.qps_limit {
            return ThrottleVerdict::Delay(Duration::from_millis(self.options.delay_ms));
        }
        ThrottleVerdict::NotThrottled
    }
}
