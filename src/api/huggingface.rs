use crate::error::{ReelError, Result};
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_VIDEO_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/ali-vilab/text-to-video-ms-1.7b";

/// 文生视频客户端 (HuggingFace Inference API)
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    token: String,
    model_url: String,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(token: String) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(ReelError::Env(
                "HF_TOKEN environment variable required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            token,
            model_url: DEFAULT_VIDEO_MODEL_URL.to_string(),
            client,
        })
    }

    pub fn with_model_url(mut self, model_url: impl Into<String>) -> Self {
        self.model_url = model_url.into();
        self
    }

    /// 生成视频并写入 `output_path`
    pub async fn generate_video(&self, prompt: &str, output_path: &Path) -> Result<()> {
        info!("Calling HF Inference API: {}", self.model_url);

        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&json!({ "inputs": prompt }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(ReelError::Api(format!(
                "Video generation API error (HTTP {}): {}",
                status, error_text
            )));
        }

        let video_data = response.bytes().await?;
        if video_data.is_empty() {
            return Err(ReelError::Api(
                "Video generation API returned an empty body".to_string(),
            ));
        }

        tokio::fs::write(output_path, &video_data).await?;
        info!("Video saved to: {}", output_path.display());
        Ok(())
    }
}
