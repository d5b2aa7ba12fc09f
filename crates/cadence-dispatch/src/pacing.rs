// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inter-send pacing.
//!
//! Successive sends through the same account are separated by a randomized
//! delay so the timing pattern does not read as mechanical. The random
//! source is injected, so tests assert bounds deterministically.

use std::time::Duration;

use rand::Rng;

use cadence_core::types::Campaign;

/// Inclusive jitter bounds between successive sends for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub min_secs: u32,
    pub max_secs: u32,
}

impl PacingPolicy {
    /// The campaign's configured jitter range.
    pub fn for_campaign(campaign: &Campaign) -> Self {
        Self {
            min_secs: campaign.jitter_min_secs,
            max_secs: campaign.jitter_max_secs,
        }
    }

    /// Draw the next inter-send delay.
    ///
    /// An inverted or collapsed range degrades to the minimum bound rather
    /// than panicking on a bad configuration row.
    pub fn delay<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs(u64::from(self.min_secs));
        }
        let secs = rng.gen_range(self.min_secs..=self.max_secs);
        Duration::from_secs(u64::from(secs))
    }
}
