// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequence template validation.
//!
//! Templates are validated at campaign setup, before activation; an active
//! campaign's steps are immutable, so nothing here runs on the dispatch path.

use cadence_core::types::{SequenceStep, StepType};
use cadence_core::CadenceError;

const ALLOCATION_TOLERANCE: f64 = 1e-6;

/// Validate an ordered step list for a campaign.
///
/// Checks: at least one step; step numbers strictly increasing from 0; the
/// sequence opens with an `initial_contact`; day offsets never decrease; and
/// every variant set carries positive allocations summing to 1.
pub fn validate_steps(steps: &[SequenceStep]) -> Result<(), CadenceError> {
    if steps.is_empty() {
        return Err(CadenceError::InvalidInput(
            "sequence template has no steps".to_string(),
        ));
    }

    if steps[0].step_number != 0 || steps[0].step_type != StepType::InitialContact {
        return Err(CadenceError::InvalidInput(
            "sequence must open with step 0 of type initial_contact".to_string(),
        ));
    }

    for pair in steps.windows(2) {
        if pair[1].step_number != pair[0].step_number + 1 {
            return Err(CadenceError::InvalidInput(format!(
                "step numbers must be contiguous: {} follows {}",
                pair[1].step_number, pair[0].step_number
            )));
        }
        if pair[1].day_offset < pair[0].day_offset {
            return Err(CadenceError::InvalidInput(format!(
                "day offsets must not decrease: step {} at offset {} follows offset {}",
                pair[1].step_number, pair[1].day_offset, pair[0].day_offset
            )));
        }
    }

    for step in steps {
        if step.message_template.trim().is_empty() {
            return Err(CadenceError::InvalidInput(format!(
                "step {} has an empty message template",
                step.step_number
            )));
        }
        if step.variants.is_empty() {
            continue;
        }
        let mut sum = 0.0;
        for variant in &step.variants {
            if variant.traffic_allocation <= 0.0 || variant.traffic_allocation > 1.0 {
                return Err(CadenceError::InvalidInput(format!(
                    "step {} variant `{}` has allocation {} outside (0, 1]",
                    step.step_number, variant.id, variant.traffic_allocation
                )));
            }
            sum += variant.traffic_allocation;
        }
        if (sum - 1.0).abs() > ALLOCATION_TOLERANCE {
            return Err(CadenceError::InvalidInput(format!(
                "step {} variant allocations sum to {sum}, expected 1",
                step.step_number
            )));
        }
    }

    Ok(())
}
