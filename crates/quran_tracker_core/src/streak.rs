//! crates/quran_tracker_core/src/streak.rs
//!
//! The streak and daily-unlock state machines.
//!
//! Both machines key off a device-local calendar date supplied by the
//! caller, compared by equality only. No ambient clock: every transition
//! takes the record and `today` explicitly and returns what happened.

use chrono::NaiveDate;

use crate::domain::{AyahKey, UserProgress};

/// Minimum similarity score for a recitation attempt to pass.
pub const PASS_THRESHOLD: f64 = 0.80;

/// Surah Al-Fatiha, whose daily recitation gates strict mode.
pub const FATIHA_SURAH: u32 = 1;

/// Ayah count of Surah Al-Fatiha.
pub const FATIHA_AYAH_COUNT: u32 = 7;

/// What a read-marking did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// The ayah was not previously in the read set.
    pub newly_read: bool,
    /// This marking was the first of a new calendar day.
    pub streak_incremented: bool,
}

/// Marks `key` as read on `today`, updating the streak machine.
///
/// The first marking of a not-yet-read ayah on a new calendar day moves the
/// record from `NotReadToday` to `ReadToday`: the streak increments by
/// exactly 1 and `last_read_date` is stamped. Re-marking an already-read
/// ayah is a no-op, and further markings the same day leave the streak
/// untouched.
pub fn mark_read(progress: &mut UserProgress, key: AyahKey, today: NaiveDate) -> ReadOutcome {
    if !progress.read_ayahs.insert(key) {
        return ReadOutcome {
            newly_read: false,
            streak_incremented: false,
        };
    }

    if progress.last_read_date != Some(today) {
        progress.streak += 1;
        progress.last_read_date = Some(today);
        return ReadOutcome {
            newly_read: true,
            streak_incremented: true,
        };
    }

    ReadOutcome {
        newly_read: true,
        streak_incremented: false,
    }
}

/// What a graded recitation attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecitationOutcome {
    /// The attempt scored at or above [`PASS_THRESHOLD`].
    pub passed: bool,
    /// The attempt completed today's Fatiha unlock (signaled at most once
    /// per calendar day).
    pub daily_unlock: bool,
}

/// Applies a graded recitation attempt on a verse of `surah` to the
/// daily-unlock machine.
///
/// A passing attempt on a Surah-1 verse with `last_fatiha_date != today`
/// stamps the date and signals the unlock; repeats the same day pass without
/// re-signaling. This gate is independent of read-marking and does not, by
/// itself, mark the verse as read.
pub fn check_recitation(
    progress: &mut UserProgress,
    surah: u32,
    score: f64,
    today: NaiveDate,
) -> RecitationOutcome {
    let passed = score >= PASS_THRESHOLD;
    let daily_unlock =
        passed && surah == FATIHA_SURAH && progress.last_fatiha_date != Some(today);

    if daily_unlock {
        progress.last_fatiha_date = Some(today);
    }

    RecitationOutcome {
        passed,
        daily_unlock,
    }
}

/// Whether the strict-mode obligation is satisfied for `today`: all seven
/// Fatiha ayahs marked read AND the recitation unlock completed today. The
/// date check dominates; a fully read Fatiha with a stale unlock date does
/// not satisfy the gate.
pub fn strict_gate_satisfied(progress: &UserProgress, today: NaiveDate) -> bool {
    let fatiha_read = (1..=FATIHA_AYAH_COUNT).all(|ayah| {
        progress.read_ayahs.contains(&AyahKey {
            surah: FATIHA_SURAH,
            ayah,
        })
    });
    fatiha_read && progress.last_fatiha_date == Some(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    fn key(s: &str) -> AyahKey {
        s.parse().unwrap()
    }

    #[test]
    fn first_read_of_a_new_day_increments_streak_once() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        progress.streak = 4;
        progress.last_read_date = Some(day(28));

        let outcome = mark_read(&mut progress, key("2:1"), day(29));
        assert!(outcome.newly_read);
        assert!(outcome.streak_incremented);
        assert_eq!(progress.streak, 5);
        assert_eq!(progress.last_read_date, Some(day(29)));

        let outcome = mark_read(&mut progress, key("2:2"), day(29));
        assert!(outcome.newly_read);
        assert!(!outcome.streak_incremented);
        assert_eq!(progress.streak, 5);
    }

    #[test]
    fn re_marking_a_read_ayah_is_a_no_op() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        mark_read(&mut progress, key("1:1"), day(29));

        let outcome = mark_read(&mut progress, key("1:1"), day(30));
        assert!(!outcome.newly_read);
        assert!(!outcome.streak_incremented);
        assert_eq!(progress.streak, 1);
        assert_eq!(progress.read_ayahs.len(), 1);
    }

    #[test]
    fn streak_never_decreases_within_a_day() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        for ayah in 1..=7 {
            mark_read(&mut progress, AyahKey { surah: 1, ayah }, day(29));
        }
        assert_eq!(progress.streak, 1);
        assert_eq!(progress.read_ayahs.len(), 7);
    }

    #[test]
    fn passing_fatiha_recitation_unlocks_once_per_day() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");

        let first = check_recitation(&mut progress, 1, 0.85, day(29));
        assert!(first.passed);
        assert!(first.daily_unlock);
        assert_eq!(progress.last_fatiha_date, Some(day(29)));

        let repeat = check_recitation(&mut progress, 1, 0.95, day(29));
        assert!(repeat.passed);
        assert!(!repeat.daily_unlock);
    }

    #[test]
    fn failing_score_neither_passes_nor_unlocks() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        let outcome = check_recitation(&mut progress, 1, 0.79, day(29));
        assert!(!outcome.passed);
        assert!(!outcome.daily_unlock);
        assert_eq!(progress.last_fatiha_date, None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        let outcome = check_recitation(&mut progress, 1, 0.80, day(29));
        assert!(outcome.passed);
        assert!(outcome.daily_unlock);
    }

    #[test]
    fn passing_outside_surah_one_never_unlocks() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        let outcome = check_recitation(&mut progress, 2, 0.99, day(29));
        assert!(outcome.passed);
        assert!(!outcome.daily_unlock);
        assert_eq!(progress.last_fatiha_date, None);
    }

    #[test]
    fn unlock_does_not_mark_anything_read() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        check_recitation(&mut progress, 1, 0.9, day(29));
        assert!(progress.read_ayahs.is_empty());
        assert_eq!(progress.streak, 0);
    }

    #[test]
    fn strict_gate_requires_both_completeness_and_todays_unlock() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        for ayah in 1..=7 {
            mark_read(&mut progress, AyahKey { surah: 1, ayah }, day(29));
        }

        // All seven read, but the unlock date is stale: gate stays closed.
        progress.last_fatiha_date = Some(day(28));
        assert!(!strict_gate_satisfied(&progress, day(29)));

        progress.last_fatiha_date = Some(day(29));
        assert!(strict_gate_satisfied(&progress, day(29)));
    }

    #[test]
    fn strict_gate_needs_every_fatiha_ayah() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        for ayah in 1..=6 {
            mark_read(&mut progress, AyahKey { surah: 1, ayah }, day(29));
        }
        progress.last_fatiha_date = Some(day(29));
        assert!(!strict_gate_satisfied(&progress, day(29)));
    }
}
