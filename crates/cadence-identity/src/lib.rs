// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution for the Cadence outreach engine.
//!
//! Normalizes raw contact records into stable, workspace-scoped prospect
//! identities, deduplicates across imports, and admits prospects into
//! campaigns under the one-active-enrollment invariant.

pub mod normalize;
pub mod resolver;

pub use normalize::{normalize_email, normalize_profile_url};
pub use resolver::{IdentityResolver, RawContact, Resolution};
