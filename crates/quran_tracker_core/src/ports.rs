//! crates/quran_tracker_core/src/ports.rs
//!
//! The traits the surrounding service must implement for the core to run:
//! storage, the verse source, and speech-to-text. Keeping them here keeps
//! the scorer, merge, and streak machines free of any database, HTTP, or
//! speech-platform detail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    BookmarkSet, CustomVerse, Surah, SurahInfo, User, UserCredentials, UserProgress,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// What any port operation can fail with. Collapses the collaborators'
/// concrete errors (database, network, speech platform) into the three
/// cases the core cares about.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait StorageService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Progress ---
    async fn get_progress(&self, user_id: Uuid) -> PortResult<Option<UserProgress>>;

    async fn put_progress(&self, user_id: Uuid, progress: &UserProgress) -> PortResult<()>;

    // --- Bookmarks (whole-set reads and writes; see the sync policy) ---
    async fn get_bookmarks(&self, user_id: Uuid) -> PortResult<Option<BookmarkSet>>;

    async fn put_bookmarks(&self, user_id: Uuid, bookmarks: &BookmarkSet) -> PortResult<()>;

    // --- Imported verses ---
    async fn put_custom_verses(&self, user_id: Uuid, verses: &[CustomVerse]) -> PortResult<()>;

    async fn get_custom_surah(&self, user_id: Uuid, number: u32) -> PortResult<Vec<CustomVerse>>;

    async fn custom_surah_numbers(&self, user_id: Uuid) -> PortResult<Vec<u32>>;
}

#[async_trait]
pub trait VerseSource: Send + Sync {
    /// The 114-surah index.
    async fn surah_index(&self) -> PortResult<Vec<SurahInfo>>;

    /// One surah with its Arabic text and translations.
    async fn surah(&self, number: u32) -> PortResult<Surah>;
}

#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    /// Turns raw recitation audio into a transcript.
    async fn transcribe_audio(&self, audio_data: &[u8]) -> PortResult<String>;
}
