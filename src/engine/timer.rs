// src/engine/timer.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// What one timer step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer is disabled or has already expired; nothing moved.
    Inactive,
    /// One second elapsed.
    Ticked { remaining: u32 },
    /// One second elapsed and a low-time threshold was crossed.
    Warning { threshold: u32, remaining: u32 },
    /// The countdown reached zero on this step.
    Expired,
}

/// Countdown for the current section.
///
/// The timer holds no clock of its own; whoever drives the session calls
/// `tick` once per elapsed second. Remaining time only ever decreases and
/// never goes below zero, warnings fire at most once per section, and
/// expiry is reported exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionTimer {
    enabled: bool,
    remaining: u32,
    warned: BTreeSet<u32>,
    expired: bool,
}

impl SectionTimer {
    /// A timer that never moves, for untimed practice runs.
    pub fn disabled() -> Self {
        SectionTimer {
            enabled: false,
            remaining: 0,
            warned: BTreeSet::new(),
            expired: false,
        }
    }

    /// A fresh countdown, seeded on section entry.
    pub fn seed(limit_secs: u32) -> Self {
        SectionTimer {
            enabled: true,
            remaining: limit_secs,
            warned: BTreeSet::new(),
            expired: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Thresholds that have already fired (or been skipped over), sorted.
    pub fn warned_thresholds(&self) -> Vec<u32> {
        self.warned.iter().copied().collect()
    }

    /// Advances the countdown by one second.
    ///
    /// When a single step crosses several thresholds at once, only the
    /// tightest one fires; the rest are marked spent so they stay silent
    /// for the remainder of the section.
    pub fn tick(&mut self, thresholds: &[u32]) -> TickOutcome {
        if !self.enabled || self.expired {
            return TickOutcome::Inactive;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            return TickOutcome::Expired;
        }

        let mut fired: Option<u32> = None;
        for &threshold in thresholds {
            if self.remaining <= threshold && self.warned.insert(threshold) {
                fired = Some(fired.map_or(threshold, |f| f.min(threshold)));
            }
        }

        match fired {
            Some(threshold) => TickOutcome::Warning {
                threshold,
                remaining: self.remaining,
            },
            None => TickOutcome::Ticked {
                remaining: self.remaining,
            },
        }
    }
}
