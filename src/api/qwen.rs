use crate::error::{ReelError, Result};
use crate::script::{build_script_prompt, Script};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com";
const TEXT_GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";
pub const DEFAULT_MODEL: &str = "qwen-plus";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct QwenClient {
    api_key: String,
    base_url: String,
    model: String,
    max_attempts: u32,
    client: Client,
}

impl QwenClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            api_key,
            base_url: DASHSCOPE_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// 使用千问大模型生成剧本
    ///
    /// Responses that fail to parse or validate are discarded and the model
    /// is asked again, up to `max_attempts` times in total.
    pub async fn generate_script(&self) -> Result<Script> {
        let prompt = build_script_prompt();
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            info!(
                "Generating script with {} (attempt {}/{})...",
                self.model, attempt, self.max_attempts
            );

            let generated_text = self.complete(&prompt).await?;
            match Script::from_json(&generated_text).and_then(Script::validated) {
                Ok(script) => {
                    info!(
                        "Generated script with {} scenes and {} dialogues",
                        script.scenes.len(),
                        script.dialogue_count()
                    );
                    return Ok(script);
                }
                Err(e) => {
                    warn!("Rejected generated script: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ReelError::Script("No script generation attempts made".to_string())))
    }

    /// Send a single user message and return the assistant's reply text.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = json!({
            "model": self.model,
            "input": {
                "messages": [
                    {
                        "role": "user",
                        "content": prompt
                    }
                ]
            },
            "parameters": {
                "result_format": "message"
            }
        });

        let response = self
            .client
            .post(format!("{}{}", self.base_url, TEXT_GENERATION_PATH))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(ReelError::Api(format!(
                "Qwen API error (HTTP {}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response.json().await?;

        // 提取生成的文本
        let generated_text = response_json["output"]["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ReelError::Api("Failed to extract generated text".to_string()))?;

        if let Some(tokens) = response_json["usage"]["total_tokens"].as_u64() {
            info!("Qwen usage: {} tokens", tokens);
        }

        Ok(generated_text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::tests::VALID_SCRIPT;
    use mockito::Matcher;

    fn completion_body(content: &str) -> String {
        json!({
            "output": {
                "choices": [
                    {"message": {"role": "assistant", "content": content}}
                ]
            },
            "usage": {"total_tokens": 812}
        })
        .to_string()
    }

    #[tokio::test]
    async fn generates_valid_script() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TEXT_GENERATION_PATH)
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({"model": "qwen-plus"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(&format!("```json\n{}\n```", VALID_SCRIPT)))
            .create_async()
            .await;

        let client = QwenClient::new("test-key".to_string())
            .unwrap()
            .with_base_url(server.url());
        let script = client.generate_script().await.unwrap();

        assert_eq!(script.scenes.len(), 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_invalid_script_then_gives_up() {
        let mut server = mockito::Server::new_async().await;
        let invalid = VALID_SCRIPT.replace("\"sadness\"", "\"rage\"");
        let mock = server
            .mock("POST", TEXT_GENERATION_PATH)
            .with_status(200)
            .with_body(completion_body(&invalid))
            .expect(2)
            .create_async()
            .await;

        let client = QwenClient::new("test-key".to_string())
            .unwrap()
            .with_base_url(server.url())
            .with_max_attempts(2);
        let err = client.generate_script().await.unwrap_err();

        assert!(matches!(err, ReelError::InvalidScript(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut server = mockito::Server::new_async().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let invalid = VALID_SCRIPT.replace("\"shock\"", "\"sadness\"");
        let mock = server
            .mock("POST", TEXT_GENERATION_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |_| {
                let reply = if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    invalid.as_str()
                } else {
                    VALID_SCRIPT
                };
                completion_body(reply).into_bytes()
            })
            .expect(2)
            .create_async()
            .await;

        let client = QwenClient::new("test-key".to_string())
            .unwrap()
            .with_base_url(server.url())
            .with_max_attempts(3);
        let script = client.generate_script().await.unwrap();

        assert_eq!(script.scenes[4].emotion, crate::script::Emotion::Shock);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", TEXT_GENERATION_PATH)
            .with_status(401)
            .with_body(r#"{"code":"InvalidApiKey"}"#)
            .create_async()
            .await;

        let client = QwenClient::new("bad-key".to_string())
            .unwrap()
            .with_base_url(server.url());
        let err = client.generate_script().await.unwrap_err();

        match err {
            ReelError::Api(msg) => assert!(msg.contains("InvalidApiKey")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
