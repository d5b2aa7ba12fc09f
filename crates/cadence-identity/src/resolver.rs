// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution and enrollment admission.
//!
//! `resolve` turns a raw import row into a stable, workspace-scoped prospect:
//! normalize the primary identifier, look up by key, merge or create.
//! `enroll` admits a resolved prospect into a campaign while holding the
//! one-active-enrollment invariant.

use std::sync::Arc;

use tracing::{debug, info};

use cadence_core::types::{Enrollment, EnrollmentStatus, Prospect, ProspectStatus};
use cadence_core::{CadenceError, StorageAdapter};

use crate::normalize::{normalize_email, normalize_profile_url};

/// One raw contact row from an import, prior to any normalization.
#[derive(Debug, Clone, Default)]
pub struct RawContact {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
}

/// Outcome of resolving one raw contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub prospect_id: String,
    pub is_new: bool,
}

/// Resolves raw contacts into deduplicated prospects.
pub struct IdentityResolver {
    storage: Arc<dyn StorageAdapter>,
}

impl IdentityResolver {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Resolve a raw contact within a workspace.
    ///
    /// The profile URL slug outranks the email as the identity key when both
    /// are present. Re-resolving identical input is a no-op returning the
    /// same prospect id. An existing prospect whose email materially differs
    /// from the import's is surfaced as [`CadenceError::IdentityConflict`],
    /// never silently merged.
    pub async fn resolve(
        &self,
        workspace_id: &str,
        raw: &RawContact,
    ) -> Result<Resolution, CadenceError> {
        let email = raw.email.as_deref().and_then(normalize_email);
        let profile = raw.profile_url.as_deref().and_then(normalize_profile_url);

        let identity_key = profile
            .clone()
            .or_else(|| email.clone())
            .ok_or_else(|| {
                CadenceError::InvalidInput(
                    "raw contact carries neither a profile URL nor an email".to_string(),
                )
            })?;

        match self
            .storage
            .get_prospect_by_key(workspace_id, &identity_key)
            .await?
        {
            Some(existing) => {
                let merged = merge_fields(&existing, raw, email.as_deref(), profile.as_deref())?;
                if let Some(updated) = merged {
                    debug!(prospect_id = %updated.id, "merged re-imported contact fields");
                    self.storage.update_prospect(&updated).await?;
                }
                Ok(Resolution {
                    prospect_id: existing.id,
                    is_new: false,
                })
            }
            None => {
                let prospect = Prospect {
                    id: uuid::Uuid::new_v4().to_string(),
                    workspace_id: workspace_id.to_string(),
                    identity_key: identity_key.clone(),
                    display_name: non_empty(raw.display_name.as_deref()),
                    email,
                    profile_url: profile,
                    title: non_empty(raw.title.as_deref()),
                    company: non_empty(raw.company.as_deref()),
                    status: ProspectStatus::Pending,
                    created_at: String::new(),
                    updated_at: String::new(),
                };
                self.storage.insert_prospect(&prospect).await?;
                info!(prospect_id = %prospect.id, identity_key = %identity_key, "new prospect created");
                Ok(Resolution {
                    prospect_id: prospect.id,
                    is_new: true,
                })
            }
        }
    }

    /// Admit a prospect into a campaign.
    ///
    /// Idempotent for the same campaign: re-admitting returns the existing
    /// enrollment. An active enrollment in a different campaign is a
    /// [`CadenceError::EnrollmentConflict`].
    pub async fn enroll(
        &self,
        prospect_id: &str,
        campaign_id: &str,
    ) -> Result<Enrollment, CadenceError> {
        if let Some(active) = self.storage.active_enrollment_for(prospect_id).await? {
            if active.campaign_id == campaign_id {
                return Ok(active);
            }
            return Err(CadenceError::EnrollmentConflict {
                prospect_id: prospect_id.to_string(),
                campaign_id: active.campaign_id,
            });
        }

        let enrollment = Enrollment {
            id: uuid::Uuid::new_v4().to_string(),
            campaign_id: campaign_id.to_string(),
            prospect_id: prospect_id.to_string(),
            status: EnrollmentStatus::Pending,
            variant_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        self.storage.insert_enrollment(&enrollment).await?;
        info!(prospect_id, campaign_id, "prospect enrolled");
        Ok(enrollment)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Merge incoming fields into an existing prospect.
///
/// Display fields follow last-non-empty-wins: a populated incoming value
/// replaces the stored one, a blank never erases. The material identifiers
/// (email, profile URL) conflict instead of merging when both sides are
/// populated and differ.
///
/// Returns `Some(updated)` when anything changed, `None` for a pure no-op.
fn merge_fields(
    existing: &Prospect,
    raw: &RawContact,
    email: Option<&str>,
    profile: Option<&str>,
) -> Result<Option<Prospect>, CadenceError> {
    let mut updated = existing.clone();
    let mut changed = false;

    if let Some(incoming) = email {
        match updated.email.as_deref() {
            Some(current) if current != incoming => {
                return Err(CadenceError::IdentityConflict {
                    identity_key: existing.identity_key.clone(),
                    field: "email".to_string(),
                    existing: current.to_string(),
                    incoming: incoming.to_string(),
                });
            }
            Some(_) => {}
            None => {
                updated.email = Some(incoming.to_string());
                changed = true;
            }
        }
    }

    if let Some(incoming) = profile {
        match updated.profile_url.as_deref() {
            Some(current) if current != incoming => {
                return Err(CadenceError::IdentityConflict {
                    identity_key: existing.identity_key.clone(),
                    field: "profile_url".to_string(),
                    existing: current.to_string(),
                    incoming: incoming.to_string(),
                });
            }
            Some(_) => {}
            None => {
                updated.profile_url = Some(incoming.to_string());
                changed = true;
            }
        }
    }

    for (slot, incoming) in [
        (&mut updated.display_name, raw.display_name.as_deref()),
        (&mut updated.title, raw.title.as_deref()),
        (&mut updated.company, raw.company.as_deref()),
    ] {
        if let Some(value) = non_empty(incoming) {
            if slot.as_deref() != Some(value.as_str()) {
                *slot = Some(value);
                changed = true;
            }
        }
    }

    Ok(if changed { Some(updated) } else { None })
}
