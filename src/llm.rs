use crate::config::{GeminiConfig, LlmConfig, OllamaConfig, OpenAIConfig};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A document handed to the model next to the prompt.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    pub fn is_textual(&self) -> bool {
        let mime = self.mime_type.to_ascii_lowercase();
        mime.starts_with("text/") || mime == "application/json" || mime.ends_with("+json")
    }

    /// Inlines the attachment into a text prompt, for providers without file parts.
    fn inline_into(&self, prompt: &str) -> Result<String> {
        if !self.is_textual() {
            bail!(
                "attachments of type '{}' are only supported by the gemini provider",
                self.mime_type
            );
        }
        let text = String::from_utf8_lossy(&self.data);
        Ok(format!("{}\n\nDocument ({}):\n{}", prompt, self.mime_type, text))
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    async fn generate(&self, prompt: &str, attachment: Option<&Attachment>) -> Result<String>;
}

pub fn create_llm(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider.as_str() {
        "gemini" => {
            let cfg = config.gemini.as_ref().context("Gemini config missing")?;
            Ok(Box::new(GeminiClient::new(cfg)))
        }
        "ollama" => {
            let cfg = config.ollama.as_ref().context("Ollama config missing")?;
            Ok(Box::new(OllamaClient::new(cfg)))
        }
        "openai" => {
            let cfg = config.openai.as_ref().context("OpenAI config missing")?;
            Ok(Box::new(OpenAIClient::new(cfg)))
        }
        _ => Err(anyhow!("Unknown LLM provider: {}", config.provider)),
    }
}

// --- Gemini ---
#[derive(Debug)]
struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    fn new(cfg: &GeminiConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: GeminiInlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

fn gemini_request(prompt: &str, attachment: Option<&Attachment>) -> GeminiRequest {
    let mut parts = vec![GeminiPart::Text {
        text: prompt.to_string(),
    }];
    if let Some(attachment) = attachment {
        parts.push(GeminiPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: attachment.mime_type.clone(),
                data: attachment.to_base64(),
            },
        });
    }
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts,
        }],
    }
}

fn gemini_text(response_text: &str) -> Result<String> {
    let result: GeminiResponse = match serde_json::from_str(response_text) {
        Ok(r) => r,
        Err(e) => {
            return Err(anyhow!(
                "Failed to parse Gemini response: {}. Body: {}",
                e,
                response_text
            ))
        }
    };

    if let Some(err) = result.error {
        return Err(anyhow!("Gemini API returned error: {}", err.message));
    }

    if let Some(first) = result.candidates.as_ref().and_then(|c| c.first()) {
        if let Some(content) = &first.content {
            if !content.parts.is_empty() {
                return Ok(content.parts.iter().map(|p| p.text.as_str()).collect());
            }
        }

        let reason = first.finish_reason.as_deref().unwrap_or("UNKNOWN");
        return Err(anyhow!("Gemini response empty. Finish reason: {}", reason));
    }

    Err(anyhow!(
        "Gemini response format unexpected or empty. Body: {}",
        response_text
    ))
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str, attachment: Option<&Attachment>) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&gemini_request(prompt, attachment))
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("Gemini API error: {}", error_text));
        }

        let response_text = resp.text().await?;
        debug!("Raw Gemini response: {}", response_text);
        gemini_text(&response_text)
    }
}

// --- Ollama ---
#[derive(Debug)]
struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    fn new(cfg: &OllamaConfig) -> Self {
        Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
}

#[derive(Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str, attachment: Option<&Attachment>) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let content = match attachment {
            Some(a) => a.inline_into(prompt)?,
            None => prompt.to_string(),
        };

        let request_body = OllamaRequest {
            model: self.model.clone(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content,
            }],
            stream: false,
        };

        let resp = self.client.post(&url).json(&request_body).send().await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("Ollama API error: {}", error_text));
        }

        let result: OllamaResponse = resp.json().await?;
        Ok(result.message.content)
    }
}

// --- OpenAI ---

#[derive(Debug)]
struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    fn new(cfg: &OpenAIConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg
                .base_url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn generate(&self, prompt: &str, attachment: Option<&Attachment>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let content = match attachment {
            Some(a) => a.inline_into(prompt)?,
            None => prompt.to_string(),
        };

        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content,
            }],
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("OpenAI API error: {}", error_text));
        }

        let result: OpenAIResponse = resp.json().await?;
        if let Some(choice) = result.choices.first() {
            if let Some(content) = &choice.message.content {
                return Ok(content.clone());
            }
        }

        Err(anyhow!("OpenAI response empty or missing content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_request_carries_inline_document() {
        let attachment = Attachment::new("text/plain", b"Title: The Last Star".to_vec());
        let request = gemini_request("Analyze this", Some(&attachment));
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "Analyze this");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "text/plain");
        assert_eq!(
            parts[1]["inlineData"]["data"],
            "VGl0bGU6IFRoZSBMYXN0IFN0YXI="
        );
    }

    #[test]
    fn test_gemini_request_without_attachment() {
        let json = serde_json::to_value(gemini_request("Hello", None)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_gemini_response_parsing_safety_block() {
        let json = r#"{
            "candidates": [
                {
                    "finishReason": "SAFETY",
                    "index": 0
                }
            ]
        }"#;

        let err = gemini_text(json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_gemini_response_parsing_empty_content() {
        let json = r#"{
            "candidates": [
                {
                    "content": { "role": "model" },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;

        let err = gemini_text(json).unwrap_err();
        assert!(err.to_string().contains("Finish reason: STOP"));
    }

    #[test]
    fn test_gemini_response_parsing_success() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "{\"title\": " },
                            { "text": "\"X\"}" }
                        ],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;

        assert_eq!(gemini_text(json).unwrap(), r#"{"title": "X"}"#);
    }

    #[test]
    fn test_gemini_api_error_payload() {
        let json = r#"{"error": {"code": 400, "message": "API key not valid"}}"#;
        let err = gemini_text(json).unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }

    #[test]
    fn test_openai_response_parsing_success() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1677652288,
            "model": "gpt-3.5-turbo-0613",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello there, how may I assist you today?"
                },
                "logprobs": null,
                "finish_reason": "stop"
            }]
        }"#;

        let result: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            result.choices[0].message.content.as_deref(),
            Some("Hello there, how may I assist you today?")
        );
    }

    #[test]
    fn test_textual_attachment_is_inlined() {
        let attachment = Attachment::new("text/markdown", b"# The Last Star".to_vec());
        let prompt = attachment.inline_into("Analyze").unwrap();
        assert!(prompt.starts_with("Analyze"));
        assert!(prompt.contains("Document (text/markdown):\n# The Last Star"));
    }

    #[test]
    fn test_binary_attachment_is_rejected_without_file_parts() {
        let attachment = Attachment::new("application/pdf", vec![0x25, 0x50, 0x44, 0x46]);
        assert!(!attachment.is_textual());
        assert!(attachment.inline_into("Analyze").is_err());
    }

    #[test]
    fn test_create_llm_unknown_provider() {
        let config = LlmConfig {
            provider: "mock".to_string(),
            ..LlmConfig::default()
        };
        assert!(create_llm(&config).is_err());
    }

    #[test]
    fn test_create_llm_without_api_key() {
        // A missing credential only surfaces when a call is made.
        let config = LlmConfig::default();
        assert!(create_llm(&config).is_ok());
    }
}
