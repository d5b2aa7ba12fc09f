// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for integration tests.
//!
//! Temp-dir-backed storage plus entity builders with sensible defaults, so
//! tests only spell out the fields they are exercising.

use std::sync::Arc;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use cadence_config::model::StorageConfig;
use cadence_core::types::{
    Campaign, CampaignStatus, ChannelKind, Enrollment, EnrollmentStatus, Prospect, ProspectStatus,
    SequenceStep, StepType,
};
use cadence_core::StorageAdapter;
use cadence_storage::SqliteStorage;

/// Open an initialized SQLite storage in a fresh temp dir.
///
/// The `TempDir` must be held for the storage's lifetime.
pub async fn temp_storage() -> (Arc<SqliteStorage>, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("cadence-test.db");
    let storage = Arc::new(SqliteStorage::new(StorageConfig {
        database_path: db_path.to_str().unwrap().to_string(),
        wal_mode: true,
    }));
    storage.initialize().await.expect("initialize storage");
    (storage, dir)
}

/// Deterministic RNG for schedule and jitter assertions.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A UTC-windowed, always-open email campaign with zero jitter.
pub fn campaign_fixture(id: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        workspace_id: "ws-1".to_string(),
        name: format!("campaign {id}"),
        channel: ChannelKind::Email,
        account_ref: "acct-1".to_string(),
        timezone: "UTC".to_string(),
        work_start_min: 0,
        work_end_min: 24 * 60,
        daily_cap: 100,
        jitter_min_secs: 0,
        jitter_max_secs: 0,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        gate_follow_ups: false,
        status: CampaignStatus::Active,
        next_check_at: None,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

/// A prospect with both identifiers populated.
pub fn prospect_fixture(id: &str) -> Prospect {
    Prospect {
        id: id.to_string(),
        workspace_id: "ws-1".to_string(),
        identity_key: format!("in/prospect-{id}"),
        display_name: Some("Jane Doe".to_string()),
        email: Some(format!("{id}@example.com")),
        profile_url: Some(format!("in/prospect-{id}")),
        title: Some("VP Engineering".to_string()),
        company: Some("Acme".to_string()),
        status: ProspectStatus::Pending,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

/// A pending enrollment linking a prospect to a campaign.
pub fn enrollment_fixture(id: &str, campaign_id: &str, prospect_id: &str) -> Enrollment {
    Enrollment {
        id: id.to_string(),
        campaign_id: campaign_id.to_string(),
        prospect_id: prospect_id.to_string(),
        status: EnrollmentStatus::Pending,
        variant_id: None,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

/// A plain three-step template: initial contact, follow-up, final.
pub fn steps_fixture(campaign_id: &str) -> Vec<SequenceStep> {
    vec![
        SequenceStep {
            campaign_id: campaign_id.to_string(),
            step_number: 0,
            day_offset: 0,
            step_type: StepType::InitialContact,
            message_template: "Hi {first_name}, quick question about {company}".to_string(),
            subject_template: Some("Hello {first_name}".to_string()),
            variants: vec![],
        },
        SequenceStep {
            campaign_id: campaign_id.to_string(),
            step_number: 1,
            day_offset: 2,
            step_type: StepType::FollowUp,
            message_template: "Bumping this, {first_name}".to_string(),
            subject_template: None,
            variants: vec![],
        },
        SequenceStep {
            campaign_id: campaign_id.to_string(),
            step_number: 2,
            day_offset: 5,
            step_type: StepType::Final,
            message_template: "Last try, {first_name}".to_string(),
            subject_template: None,
            variants: vec![],
        },
    ]
}

/// Insert a campaign + prospect + enrollment + template in one call.
///
/// Returns the enrollment id.
pub async fn seed_enrollment(
    storage: &Arc<SqliteStorage>,
    campaign: &Campaign,
    prospect: &Prospect,
) -> String {
    storage.insert_campaign(campaign).await.expect("campaign");
    storage.insert_prospect(prospect).await.expect("prospect");
    storage
        .insert_steps(&steps_fixture(&campaign.id))
        .await
        .expect("steps");
    let enrollment = enrollment_fixture(
        &format!("e-{}-{}", campaign.id, prospect.id),
        &campaign.id,
        &prospect.id,
    );
    storage
        .insert_enrollment(&enrollment)
        .await
        .expect("enrollment");
    enrollment.id
}
