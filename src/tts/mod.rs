mod premium;
mod standard;

pub use premium::PremiumVoiceClient;
pub use standard::StandardVoiceClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProviderKind;

/// A text-to-speech backend. Implementations are stateless and thread-safe;
/// the synthesis manager decides which one to call and meters usage.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize the instruction into audio bytes (mpeg).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    fn kind(&self) -> ProviderKind;

    /// Voice identifier recorded on the audio row, when the backend has one.
    fn voice_id(&self) -> Option<&str> {
        None
    }
}
