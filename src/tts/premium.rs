use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::ProviderKind;
use crate::tts::SpeechProvider;

const PREMIUM_API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const PREMIUM_MODEL: &str = "eleven_multilingual_v2";

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// Premium provider, billed per character of input text.
pub struct PremiumVoiceClient {
    client: Client,
    api_key: String,
    voice_id: String,
}

impl PremiumVoiceClient {
    pub fn new(api_key: String, voice_id: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key,
            voice_id,
        }
    }
}

#[async_trait]
impl SpeechProvider for PremiumVoiceClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SynthesisRequest {
            text,
            model_id: PREMIUM_MODEL,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.5,
            },
        };

        let response = self
            .client
            .post(format!("{}/{}", PREMIUM_API_URL, self.voice_id))
            .header("accept", "audio/mpeg")
            .header("xi-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Synthesis(format!(
                "premium provider error: HTTP {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Premium
    }

    fn voice_id(&self) -> Option<&str> {
        Some(&self.voice_id)
    }
}
