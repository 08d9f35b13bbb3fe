use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,

    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String, // "gemini", "ollama" or "openai"
    #[serde(default = "default_gemini")]
    pub gemini: Option<GeminiConfig>,
    #[serde(default = "default_ollama")]
    pub ollama: Option<OllamaConfig>,
    #[serde(default = "default_openai")]
    pub openai: Option<OpenAIConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_output() -> String {
    "output".to_string()
}
fn default_max_upload_mb() -> usize {
    25
}
fn default_provider() -> String {
    "gemini".to_string()
}
fn default_gemini_model() -> String {
    "gemini-flash-latest".to_string()
}
fn default_gemini() -> Option<GeminiConfig> {
    Some(GeminiConfig {
        api_key: String::new(),
        model: default_gemini_model(),
    })
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai() -> Option<OpenAIConfig> {
    Some(OpenAIConfig {
        api_key: String::new(),
        model: default_openai_model(),
        base_url: None,
    })
}
fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_ollama_model() -> String {
    "llama3".to_string()
}
fn default_ollama() -> Option<OllamaConfig> {
    Some(OllamaConfig {
        base_url: default_ollama_url(),
        model: default_ollama_model(),
    })
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            gemini: default_gemini(),
            ollama: default_ollama(),
            openai: default_openai(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            output_folder: default_output(),
            max_upload_mb: default_max_upload_mb(),
            llm: LlmConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.yml` from the working directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default configuration", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Fills empty API keys from `GEMINI_API_KEY` / `OPENAI_API_KEY`.
    pub fn apply_env(&mut self) {
        self.apply_keys(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("OPENAI_API_KEY").ok(),
        );
    }

    fn apply_keys(&mut self, gemini_key: Option<String>, openai_key: Option<String>) {
        if let (Some(cfg), Some(key)) = (self.llm.gemini.as_mut(), gemini_key) {
            if cfg.api_key.is_empty() {
                cfg.api_key = key;
            }
        }
        if let (Some(cfg), Some(key)) = (self.llm.openai.as_mut(), openai_key) {
            if cfg.api_key.is_empty() {
                cfg.api_key = key;
            }
        }
    }

    /// Whether the selected provider has the credential it needs.
    pub fn has_credentials(&self) -> bool {
        match self.llm.provider.as_str() {
            "gemini" => self.llm.gemini.as_ref().is_some_and(|c| !c.api_key.is_empty()),
            "openai" => self.llm.openai.as_ref().is_some_and(|c| !c.api_key.is_empty()),
            _ => true,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
