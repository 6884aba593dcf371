//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for the recitation-check feature.

use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// NOTE: The user's recitation audio is sent as raw Binary frames, not as part
// of this enum.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Targets a verse for the recitation check. Must be the first message on
    /// the connection; may be sent again to switch verses.
    Init { surah: u32, ayah: u32 },

    /// Signals that the user has started reciting. The server clears its
    /// buffer and starts accepting audio frames.
    RecitationStarted,

    /// Signals that the user has finished reciting. The server now
    /// transcribes and grades the buffered audio.
    RecitationEnded,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the target verse and echoes its expected text.
    RecitationReady {
        surah: u32,
        ayah: u32,
        arabic_text: String,
    },

    /// Confirms the server is buffering audio. The UI can show a
    /// "listening..." state.
    Listening,

    /// Reports a recoverable error; the attempt can be retried on the same
    /// connection.
    Error { message: String },

    /// The graded outcome of a recitation attempt.
    RecitationResult {
        transcript: String,
        score: f64,
        passed: bool,
        /// True when this attempt completed today's Fatiha unlock.
        daily_unlock: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_deserialize_from_tagged_json() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "init", "surah": 1, "ayah": 3}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Init { surah: 1, ayah: 3 }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "recitation_ended"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::RecitationEnded));
    }

    #[test]
    fn server_result_serializes_with_snake_case_tag() {
        let msg = ServerMessage::RecitationResult {
            transcript: "text".to_string(),
            score: 0.85,
            passed: true,
            daily_unlock: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "recitation_result");
        assert_eq!(json["passed"], true);
    }
}
