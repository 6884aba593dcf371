//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::config::Config;
use quran_tracker_core::domain::Verse;
use quran_tracker_core::ports::{
    PortError, PortResult, SpeechToTextService, StorageService, VerseSource,
};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn StorageService>,
    pub config: Arc<Config>,
    pub verses: Arc<dyn VerseSource>,
    pub sst_adapter: Arc<dyn SpeechToTextService>,
}

//=========================================================================================
// RecitationState (Specific to One WebSocket Connection)
//=========================================================================================

/// An enum representing the current mode of a recitation connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecitationMode {
    /// Waiting for the client to start speaking.
    Idle,
    /// Buffering incoming audio frames.
    Listening,
}

/// The state for a single, active recitation-check WebSocket connection.
pub struct RecitationState {
    pub user_id: Uuid,
    /// The verse the recitation is graded against.
    pub verse: Verse,
    pub mode: RecitationMode,
    pub audio_buffer: Vec<u8>,
}

impl RecitationState {
    /// Creates a new `RecitationState` by resolving the target verse.
    ///
    /// The user's imported verses take precedence over the upstream edition,
    /// matching what the reader displays.
    pub async fn new(
        app_state: Arc<AppState>,
        user_id: Uuid,
        surah: u32,
        ayah: u32,
    ) -> PortResult<Self> {
        let custom = app_state.db.get_custom_surah(user_id, surah).await?;
        let verse = if let Some(custom_verse) = custom.into_iter().find(|v| v.key.ayah == ayah) {
            Verse {
                key: custom_verse.key,
                arabic_text: custom_verse.text,
                translations: Vec::new(),
                audio_url: None,
            }
        } else {
            let surah_data = app_state.verses.surah(surah).await?;
            surah_data
                .verses
                .into_iter()
                .find(|v| v.key.ayah == ayah)
                .ok_or_else(|| {
                    PortError::NotFound(format!("Ayah {}:{} not found", surah, ayah))
                })?
        };

        Ok(Self {
            user_id,
            verse,
            mode: RecitationMode::Idle,
            audio_buffer: Vec::new(),
        })
    }
}
