mod gemini;
mod prompt;
pub mod types;

pub use gemini::{GeminiAnalyzer, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use types::EnvironmentalAnalysis;

use crate::capture::EncodedImage;
use anyhow::Result;
use async_trait::async_trait;

/// Trait for analysis collaborators
/// Allows swapping the hosted model (or a fake in tests) behind the session
#[async_trait(?Send)]
pub trait Analyzer {
    /// Interpret one frame
    ///
    /// # Arguments
    /// * `image` - Encoded still frame
    /// * `reference_time` - GST clock at capture, only meaningful when `is_live`
    /// * `is_live` - Whether the frame came from the camera rather than an upload
    async fn analyze(&self, image: &EncodedImage, reference_time: &str, is_live: bool) -> Result<EnvironmentalAnalysis>;
}
