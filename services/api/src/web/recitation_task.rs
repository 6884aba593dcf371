//! services/api/src/web/recitation_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! grading a single recitation attempt.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, RecitationState},
};
use axum::extract::ws::{Message, WebSocket};
use chrono::Local;
use futures::{stream::SplitSink, SinkExt};
use quran_tracker_core::{
    ports::{PortError, PortResult},
    similarity, streak,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Transcribes the buffered audio, scores it against the expected verse,
/// applies the daily-unlock machine, and reports the result to the client.
///
/// Failures are recoverable: the attempt can be retried on the same
/// connection with a fresh `recitation_started`.
pub async fn recitation_process(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<RecitationState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
) -> PortResult<()> {
    let (audio_buffer, expected_text, surah, user_id) = {
        let mut session = session_state_lock.lock().await;
        let audio_buffer = std::mem::take(&mut session.audio_buffer);
        (
            audio_buffer,
            session.verse.arabic_text.clone(),
            session.verse.key.surah,
            session.user_id,
        )
    };

    if audio_buffer.is_empty() {
        warn!("Recitation ended with no audio buffered.");
        return Err(PortError::Unexpected("No audio was received.".to_string()));
    }

    let transcript = app_state.sst_adapter.transcribe_audio(&audio_buffer).await?;
    info!("Transcribed recitation: '{}'", transcript);

    let score = similarity(&transcript, &expected_text);

    // The unlock machine only mutates the record on a passing Surah-1
    // attempt that hasn't unlocked today; skip the write otherwise.
    let today = Local::now().date_naive();
    let mut progress = app_state
        .db
        .get_progress(user_id)
        .await?
        .ok_or_else(|| PortError::NotFound(format!("No progress record for user {}", user_id)))?;
    let outcome = streak::check_recitation(&mut progress, surah, score, today);

    if outcome.daily_unlock {
        app_state.db.put_progress(user_id, &progress).await?;
        info!("User {} completed today's Fatiha unlock", user_id);
    }

    let result_msg = ServerMessage::RecitationResult {
        transcript,
        score,
        passed: outcome.passed,
        daily_unlock: outcome.daily_unlock,
    };
    let result_json = serde_json::to_string(&result_msg)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    if ws_sender
        .lock()
        .await
        .send(Message::Text(result_json.into()))
        .await
        .is_err()
    {
        return Err(PortError::Unexpected(
            "Failed to send RecitationResult message.".to_string(),
        ));
    }

    Ok(())
}
