//! crates/quran_tracker_core/src/domain.rs
//!
//! The pure data model: verse keys, progress records, bookmarks, verses,
//! and the account types. Nothing here touches storage; serde appears only
//! for the wire shapes the sync layer needs.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of chapters in the corpus.
pub const SURAH_COUNT: u32 = 114;

/// Composite identifier for one verse: `"<surah>:<ayah-in-surah>"`.
///
/// Both components are positive; the surah component is bounded by
/// [`SURAH_COUNT`]. Serializes as its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AyahKey {
    pub surah: u32,
    pub ayah: u32,
}

/// Error returned when parsing an [`AyahKey`] from its string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ayah key '{0}': expected '<surah>:<ayah>' with surah 1-114 and ayah >= 1")]
pub struct AyahKeyParseError(pub String);

impl AyahKey {
    pub fn new(surah: u32, ayah: u32) -> Result<Self, AyahKeyParseError> {
        if surah == 0 || surah > SURAH_COUNT || ayah == 0 {
            return Err(AyahKeyParseError(format!("{}:{}", surah, ayah)));
        }
        Ok(Self { surah, ayah })
    }
}

impl fmt::Display for AyahKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.surah, self.ayah)
    }
}

impl FromStr for AyahKey {
    type Err = AyahKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (surah, ayah) = s
            .split_once(':')
            .ok_or_else(|| AyahKeyParseError(s.to_string()))?;
        let surah: u32 = surah
            .trim()
            .parse()
            .map_err(|_| AyahKeyParseError(s.to_string()))?;
        let ayah: u32 = ayah
            .trim()
            .parse()
            .map_err(|_| AyahKeyParseError(s.to_string()))?;
        Self::new(surah, ayah).map_err(|_| AyahKeyParseError(s.to_string()))
    }
}

impl TryFrom<String> for AyahKey {
    type Error = AyahKeyParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AyahKey> for String {
    fn from(key: AyahKey) -> Self {
        key.to_string()
    }
}

/// Set of bookmarked verses. Lifecycle independent of [`UserProgress`].
pub type BookmarkSet = BTreeSet<AyahKey>;

/// A user's reading-progress record.
///
/// Created on first successful authentication, mutated by read-marking and
/// recitation-unlock events, persisted locally and (opportunistically)
/// remotely. Dates are device-local calendar dates compared by equality only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub read_ayahs: BTreeSet<AyahKey>,
    #[serde(default)]
    pub last_read_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_fatiha_date: Option<NaiveDate>,
}

impl UserProgress {
    /// A fresh record for a newly authenticated user, nothing read yet.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            streak: 0,
            read_ayahs: BTreeSet::new(),
            last_read_date: None,
            last_fatiha_date: None,
        }
    }
}

/// The partial shape a progress record takes on the wire and in remote
/// storage. Every field is optional; missing fields are tolerated and fall
/// back to the other side's value during a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_ayahs: Option<BTreeSet<AyahKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fatiha_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<BookmarkSet>,
}

impl From<&UserProgress> for RemoteProgress {
    fn from(progress: &UserProgress) -> Self {
        Self {
            username: Some(progress.username.clone()),
            email: Some(progress.email.clone()),
            streak: Some(progress.streak),
            read_ayahs: Some(progress.read_ayahs.clone()),
            last_read_date: progress.last_read_date,
            last_fatiha_date: progress.last_fatiha_date,
            bookmarks: None,
        }
    }
}

/// One translated rendering of a verse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Edition identifier, e.g. `en.asad`.
    pub edition: String,
    pub text: String,
}

/// One verse with its Arabic text and translations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    pub key: AyahKey,
    pub arabic_text: String,
    pub translations: Vec<Translation>,
    /// Per-verse recitation audio, when the source provides one.
    pub audio_url: Option<String>,
}

/// Index entry for one surah.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurahInfo {
    pub number: u32,
    /// Arabic name.
    pub name: String,
    pub english_name: String,
    pub ayah_count: u32,
}

/// One full surah as served to the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surah {
    pub info: SurahInfo,
    pub verses: Vec<Verse>,
}

/// A verse imported by the user, overriding the upstream edition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomVerse {
    pub key: AyahKey,
    pub text: String,
}

// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ayah_key_roundtrips_through_its_string_form() {
        let key: AyahKey = "2:255".parse().unwrap();
        assert_eq!(key, AyahKey { surah: 2, ayah: 255 });
        assert_eq!(key.to_string(), "2:255");
    }

    #[test]
    fn ayah_key_rejects_out_of_range_components() {
        assert!("0:1".parse::<AyahKey>().is_err());
        assert!("115:1".parse::<AyahKey>().is_err());
        assert!("1:0".parse::<AyahKey>().is_err());
        assert!("1".parse::<AyahKey>().is_err());
        assert!("one:two".parse::<AyahKey>().is_err());
    }

    #[test]
    fn remote_progress_tolerates_missing_fields() {
        let partial: RemoteProgress = serde_json::from_str(r#"{"streak": 5}"#).unwrap();
        assert_eq!(partial.streak, Some(5));
        assert_eq!(partial.username, None);
        assert_eq!(partial.read_ayahs, None);
    }

    #[test]
    fn read_ayahs_serialize_as_key_strings() {
        let mut progress = UserProgress::new("Sam", "sam@example.com");
        progress.read_ayahs.insert("1:1".parse().unwrap());
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["read_ayahs"][0], "1:1");
    }
}
