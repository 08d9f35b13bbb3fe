use crate::config::Config;
use crate::deck::build_presentation;
use crate::llm::LlmClient;
use crate::model::Theme;
use crate::pipeline::{Document, Pipeline};
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;

pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("md") | Some("markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

/// Runs the whole pipeline for one local document and writes the deck to disk.
pub struct WorkflowManager {
    config: Config,
    llm: Box<dyn LlmClient>,
    theme: Theme,
}

impl WorkflowManager {
    pub fn new(config: Config, llm: Box<dyn LlmClient>) -> Self {
        Self {
            config,
            llm,
            theme: Theme::default(),
        }
    }

    pub async fn build_deck(&self, document_path: &Path) -> Result<PathBuf> {
        let bytes = tokio_fs::read(document_path)
            .await
            .with_context(|| format!("Failed to read {}", document_path.display()))?;
        let document = Document {
            bytes,
            media_type: guess_media_type(document_path).to_string(),
            file_name: document_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
        };

        let pipeline = Pipeline::new(self.llm.as_ref());

        println!("Analyzing {}...", document_path.display());
        let film = pipeline.extract_film_data(&document).await?;

        // No interactive editing here: the extracted cast doubles as the user's edits.
        println!("Refining {} characters...", film.characters.len());
        let characters = pipeline
            .refine_characters(&film, &film.characters)
            .await?;
        let film = film.with_characters(characters);

        println!("Writing slides...");
        let content = pipeline.generate_slide_content(&film, &self.theme).await?;

        let presentation = build_presentation(&film, &self.theme, &content)?;
        let output_dir = Path::new(&self.config.output_folder);
        tokio_fs::create_dir_all(output_dir).await?;
        let output_path = output_dir.join(&presentation.file_name);
        tokio_fs::write(&output_path, &presentation.bytes)
            .await
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        info!("Deck written to {}", output_path.display());
        println!("Deck complete: {:?}", output_path);
        Ok(output_path)
    }
}
