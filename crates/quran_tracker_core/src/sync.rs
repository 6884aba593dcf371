//! crates/quran_tracker_core/src/sync.rs
//!
//! The local-remote reconciliation policy applied at login and around every
//! progress mutation.
//!
//! This is a deliberately simplistic last-writer-wins shallow merge with no
//! field-level timestamps or conflict detection: concurrent writes from two
//! devices lose updates. Reproduced as-is for behavioral parity; see
//! DESIGN.md for the redesign notes.

use crate::domain::{BookmarkSet, RemoteProgress, UserProgress};

/// Reconciles a locally cached progress record with the remote copy.
///
/// With no remote record the local one is returned unchanged and the caller
/// is expected to create the remote record from it (write-through). With a
/// remote record, every field the remote defines overwrites the local value;
/// fields the remote omits keep their local value.
pub fn merge_progress(local: UserProgress, remote: Option<&RemoteProgress>) -> UserProgress {
    let Some(remote) = remote else {
        return local;
    };

    UserProgress {
        username: remote.username.clone().unwrap_or(local.username),
        email: remote.email.clone().unwrap_or(local.email),
        streak: remote.streak.unwrap_or(local.streak),
        read_ayahs: remote.read_ayahs.clone().unwrap_or(local.read_ayahs),
        last_read_date: remote.last_read_date.or(local.last_read_date),
        last_fatiha_date: remote.last_fatiha_date.or(local.last_fatiha_date),
    }
}

/// Reconciles the bookmark set with the remote copy.
///
/// Bookmarks are not unioned: whichever side last wrote successfully
/// replaces the set wholesale. A remote record that defines bookmarks wins
/// outright; otherwise the local set stands.
pub fn merge_bookmarks(local: BookmarkSet, remote: Option<&RemoteProgress>) -> BookmarkSet {
    match remote.and_then(|r| r.bookmarks.as_ref()) {
        Some(remote_bookmarks) => remote_bookmarks.clone(),
        None => local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AyahKey;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn keys(raw: &[&str]) -> BTreeSet<AyahKey> {
        raw.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn absent_remote_returns_local_unchanged() {
        let mut local = UserProgress::new("Sam", "sam@example.com");
        local.streak = 2;
        local.read_ayahs = keys(&["1:1"]);

        let merged = merge_progress(local.clone(), None);
        assert_eq!(merged, local);
    }

    #[test]
    fn remote_fields_overwrite_local_fields() {
        let mut local = UserProgress::new("local-name", "sam@example.com");
        local.streak = 2;
        local.read_ayahs = keys(&["1:1", "1:2"]);

        let remote = RemoteProgress {
            username: Some("Sam".to_string()),
            streak: Some(5),
            ..Default::default()
        };

        let merged = merge_progress(local, Some(&remote));
        assert_eq!(merged.streak, 5);
        assert_eq!(merged.username, "Sam");
        // Fields the remote omits keep their local value.
        assert_eq!(merged.email, "sam@example.com");
        assert_eq!(merged.read_ayahs, keys(&["1:1", "1:2"]));
    }

    #[test]
    fn remote_read_set_replaces_local_set_without_union() {
        let mut local = UserProgress::new("Sam", "sam@example.com");
        local.read_ayahs = keys(&["2:1", "2:2"]);

        let remote = RemoteProgress {
            read_ayahs: Some(keys(&["1:1"])),
            ..Default::default()
        };

        let merged = merge_progress(local, Some(&remote));
        assert_eq!(merged.read_ayahs, keys(&["1:1"]));
    }

    #[test]
    fn remote_dates_win_when_present() {
        let mut local = UserProgress::new("Sam", "sam@example.com");
        local.last_read_date = NaiveDate::from_ymd_opt(2026, 8, 28);

        let remote = RemoteProgress {
            last_read_date: NaiveDate::from_ymd_opt(2026, 8, 29),
            ..Default::default()
        };

        let merged = merge_progress(local, Some(&remote));
        assert_eq!(merged.last_read_date, NaiveDate::from_ymd_opt(2026, 8, 29));
    }

    #[test]
    fn bookmarks_are_overwritten_not_unioned() {
        let local = keys(&["1:1", "3:4"]);
        let remote = RemoteProgress {
            bookmarks: Some(keys(&["2:255"])),
            ..Default::default()
        };

        assert_eq!(merge_bookmarks(local.clone(), Some(&remote)), keys(&["2:255"]));
        assert_eq!(merge_bookmarks(local.clone(), None), local);
    }

    #[test]
    fn remote_without_bookmarks_leaves_local_set() {
        let local = keys(&["1:1"]);
        let remote = RemoteProgress::default();
        assert_eq!(merge_bookmarks(local.clone(), Some(&remote)), local);
    }

    #[test]
    fn round_trip_through_remote_shape_is_lossless() {
        let mut local = UserProgress::new("Sam", "sam@example.com");
        local.streak = 3;
        local.read_ayahs = keys(&["1:1", "1:2", "114:6"]);
        local.last_read_date = NaiveDate::from_ymd_opt(2026, 8, 29);

        let remote = RemoteProgress::from(&local);
        let merged = merge_progress(UserProgress::new("other", "other@example.com"), Some(&remote));
        assert_eq!(merged, local);
    }
}
