//! services/api/src/adapters/sst.rs
//!
//! Whisper transcription adapter implementing the `SpeechToTextService`
//! port. The browser streams raw PCM16 frames; Whisper wants a container,
//! so the buffered audio is wrapped in a WAV header before upload. An
//! Arabic language hint keeps the model from guessing on short recitations.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{AudioInput, CreateTranscriptionRequest},
    Client,
};
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use quran_tracker_core::ports::{PortError, PortResult, SpeechToTextService};

/// Sample rate the browser capture pipeline produces.
const SAMPLE_RATE_HZ: u32 = 48_000;

#[derive(Clone)]
pub struct OpenAiSstAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSstAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Wraps little-endian mono PCM16 bytes in a WAV container. A trailing odd
/// byte is dropped rather than treated as a sample.
fn wrap_pcm16_in_wav(pcm: &[u8]) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE_HZ,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for pair in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}

#[async_trait]
impl SpeechToTextService for OpenAiSstAdapter {
    async fn transcribe_audio(&self, audio_data: &[u8]) -> PortResult<String> {
        let wav = wrap_pcm16_in_wav(audio_data)
            .map_err(|e| PortError::Unexpected(format!("WAV encoding failed: {}", e)))?;

        let request = CreateTranscriptionRequest {
            file: AudioInput::from_vec_u8("recitation.wav".into(), wav),
            model: self.model.clone(),
            language: Some("ar".to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_wrapper_emits_a_riff_header_and_all_samples() {
        // Two samples: 1 and -1.
        let pcm = [0x01, 0x00, 0xFF, 0xFF];
        let wav = wrap_pcm16_in_wav(&pcm).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte canonical header plus 2 samples of 2 bytes.
        assert_eq!(wav.len(), 44 + 4);
    }

    #[test]
    fn wav_wrapper_drops_a_trailing_odd_byte() {
        let wav = wrap_pcm16_in_wav(&[0x01, 0x00, 0x7F]).unwrap();
        assert_eq!(wav.len(), 44 + 2);
    }
}
