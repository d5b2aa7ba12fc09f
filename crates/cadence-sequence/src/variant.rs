// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A/B variant assignment.
//!
//! Selection happens once per enrollment at schedule time and the chosen
//! variant id is reused by every later step that declares variants.

use rand::Rng;

use cadence_core::types::StepVariant;

/// Select a variant by cumulative-sum walk over traffic allocations.
///
/// `draw` is a fraction in [0, 1). The first variant whose cumulative
/// allocation reaches the draw wins; floating-point edge cases (allocations
/// summing below the draw) fall back to the first variant.
pub fn select_variant(variants: &[StepVariant], draw: f64) -> Option<&StepVariant> {
    let mut cumulative = 0.0;
    for variant in variants {
        cumulative += variant.traffic_allocation;
        if cumulative >= draw {
            return Some(variant);
        }
    }
    variants.first()
}

/// Draw a fresh fraction from `rng` and select.
pub fn assign_variant<'a, R: Rng>(
    variants: &'a [StepVariant],
    rng: &mut R,
) -> Option<&'a StepVariant> {
    if variants.is_empty() {
        return None;
    }
    let draw: f64 = rng.gen_range(0.0..1.0);
    select_variant(variants, draw)
}
