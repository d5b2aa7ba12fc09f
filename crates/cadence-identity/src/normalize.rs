// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifier normalization.
//!
//! A raw contact's primary identifier is reduced to a stable key before
//! dedup lookup: profile URLs down to their lower-cased path slug, emails to
//! their trimmed lower-cased form.

/// Normalize an email address: trim and lower-case.
///
/// Returns `None` for empty or obviously malformed (no `@`) input.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return None;
    }
    Some(trimmed)
}

/// Normalize a profile URL down to its path slug.
///
/// Strips the scheme, host, query, and fragment, then trims surrounding
/// slashes and lower-cases the remainder:
/// `https://Network.example.com/in/Jane-Doe/?src=x` -> `in/jane-doe`.
/// A bare slug (`in/jane-doe`) passes through unchanged.
pub fn normalize_profile_url(raw: &str) -> Option<String> {
    let mut rest = raw.trim();
    if rest.is_empty() {
        return None;
    }

    if let Some(pos) = rest.find("://") {
        rest = &rest[pos + 3..];
    }

    // A leading host segment (contains a dot, before any slash) is stripped;
    // a bare slug like `in/jane-doe` has no dotted first segment.
    if let Some(slash) = rest.find('/') {
        let first = &rest[..slash];
        if first.contains('.') {
            rest = &rest[slash..];
        }
    } else if rest.contains('.') {
        // Host only, no path: nothing identifies a profile.
        return None;
    }

    let end = rest
        .find(['?', '#'])
        .unwrap_or(rest.len());
    let slug = rest[..end].trim_matches('/').to_lowercase();

    if slug.is_empty() {
        return None;
    }
    Some(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM "),
            Some("jane.doe@example.com".to_string())
        );
    }

    #[test]
    fn empty_or_malformed_email_is_rejected() {
        assert_eq!(normalize_email("   "), None);
        assert_eq!(normalize_email("not-an-email"), None);
    }

    #[test]
    fn full_url_reduces_to_path_slug() {
        assert_eq!(
            normalize_profile_url("https://network.example.com/in/Jane-Doe/"),
            Some("in/jane-doe".to_string())
        );
    }

    #[test]
    fn query_and_fragment_are_stripped() {
        assert_eq!(
            normalize_profile_url("https://network.example.com/in/jane-doe?src=import#top"),
            Some("in/jane-doe".to_string())
        );
    }

    #[test]
    fn schemeless_url_with_host_is_handled() {
        assert_eq!(
            normalize_profile_url("network.example.com/in/jane-doe"),
            Some("in/jane-doe".to_string())
        );
    }

    #[test]
    fn bare_slug_passes_through() {
        assert_eq!(
            normalize_profile_url("in/Jane-Doe"),
            Some("in/jane-doe".to_string())
        );
    }

    #[test]
    fn host_without_path_is_rejected() {
        assert_eq!(normalize_profile_url("https://network.example.com"), None);
        assert_eq!(normalize_profile_url("https://network.example.com/"), None);
    }

    #[test]
    fn same_profile_in_different_shapes_yields_same_key() {
        let variants = [
            "https://network.example.com/in/jane-doe",
            "http://network.example.com/in/Jane-Doe/",
            "network.example.com/in/jane-doe?utm=1",
            "in/jane-doe",
        ];
        for v in variants {
            assert_eq!(
                normalize_profile_url(v),
                Some("in/jane-doe".to_string()),
                "variant: {v}"
            );
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // A normalized key must survive re-normalization unchanged, or
            // re-imports of already-clean data would fork identities.
            #[test]
            fn email_normalization_is_idempotent(
                raw in "[ ]{0,2}[A-Za-z0-9._%+-]{1,12}@[A-Za-z0-9.-]{1,12}[ ]{0,2}"
            ) {
                if let Some(once) = normalize_email(&raw) {
                    prop_assert_eq!(normalize_email(&once), Some(once.clone()));
                }
            }

            #[test]
            fn profile_normalization_is_idempotent(
                slug in "[a-z]{1,8}/[a-z0-9-]{1,16}"
            ) {
                let url = format!("https://network.example.com/{slug}?src=import");
                let once = normalize_profile_url(&url).unwrap();
                prop_assert_eq!(normalize_profile_url(&once), Some(once.clone()));
            }
        }
    }
}
