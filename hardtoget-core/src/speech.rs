use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Mouth-shape label for silence; every viseme timeline ends with it.
pub const VISEME_SILENCE: &str = "viseme_sil";

/// One mouth shape at a point in the audio timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisemeFrame {
    pub time_ms: u64,
    pub viseme: String,
}

/// Rendered speech for one reply: opaque audio plus the lip-sync
/// timeline covering its duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechClip {
    pub audio_base64: String,
    pub visemes: Vec<VisemeFrame>,
}

impl SpeechClip {
    /// Empty audio with a single terminating silence frame.
    pub fn silent() -> Self {
        Self {
            audio_base64: String::new(),
            visemes: vec![VisemeFrame {
                time_ms: 0,
                viseme: VISEME_SILENCE.to_string(),
            }],
        }
    }

    /// Wraps raw audio bytes and a viseme timeline, appending the
    /// terminating silence frame if the synthesizer left it off.
    pub fn from_audio(audio: &[u8], mut visemes: Vec<VisemeFrame>) -> Self {
        use base64::Engine as _;

        let ends_in_silence = visemes
            .last()
            .map(|f| f.viseme == VISEME_SILENCE)
            .unwrap_or(false);
        if !ends_in_silence {
            let end = visemes.last().map(|f| f.time_ms).unwrap_or(0);
            visemes.push(VisemeFrame {
                time_ms: end,
                viseme: VISEME_SILENCE.to_string(),
            });
        }

        Self {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio),
            visemes,
        }
    }
}

/// Presentation-only collaborator: display text in, audio and visemes
/// out. It runs after a round is settled and has no say in the
/// economy; a failure here is logged and swallowed, never rolled back
/// into the ledger.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SpeechClip>;
}

/// No-op synthesizer for tests and headless deployments.
pub struct NullSpeech;

#[async_trait]
impl SpeechSynthesizer for NullSpeech {
    async fn synthesize(&self, _text: &str) -> Result<SpeechClip> {
        Ok(SpeechClip::silent())
    }
}
