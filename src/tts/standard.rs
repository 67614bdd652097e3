use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::ProviderKind;
use crate::tts::SpeechProvider;

const STANDARD_API_URL: &str = "https://api.streamelements.com/kappa/v2/speech";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    voice: &'a str,
    text: &'a str,
}

/// Unmetered fallback provider. Lower quality, assumed always available.
pub struct StandardVoiceClient {
    client: Client,
    voice: String,
}

impl StandardVoiceClient {
    pub fn new(voice: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, voice }
    }
}

#[async_trait]
impl SpeechProvider for StandardVoiceClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            voice: &self.voice,
            text,
        };

        let response = self
            .client
            .post(STANDARD_API_URL)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Synthesis(format!(
                "standard provider error: HTTP {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Standard
    }
}
