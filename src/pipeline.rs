use crate::error::{ExtractionError, PipelineError};
use crate::llm::{Attachment, LlmClient};
use crate::model::{Character, FilmData, SlideContent, Theme};
use crate::response::{extract_json_object, strip_code_blocks, validate_slide_content, SchemaCheck};
use log::{debug, error, info};
use serde::Deserialize;

/// An uploaded script or treatment.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub file_name: Option<String>,
}

const EXTRACTION_PROMPT: &str = r#"
Analyze this film/web series document and extract the following details.
Return strictly as a JSON object with this structure:
{
  "title": "Film Title",
  "logline": "One sentence pitch",
  "genre": "Genre",
  "synopsis": "Full synopsis",
  "storySummary": {
    "act1": "Setup and Inciting Incident",
    "act2": "Rising Action and Midpoint",
    "act3": "Climax and Resolution"
  },
  "characters": [
    { "name": "Name", "role": "Role", "description": "Brief description" }
  ],
  "tone": ["keyword1", "keyword2"],
  "targetAudience": "Target Audience description",
  "themes": "Core themes and underlying message"
}
"#;

pub fn refinement_prompt(original: &str, edits: &str) -> String {
    format!(
        r#"
Original characters: {}
User corrections/notes: {}

Update the character list based on the user's corrections.
Enhance the descriptions to be pitch-ready (compelling, 2-3 sentences).
Return strictly as a JSON object with this structure:
{{
  "characters": [
    {{ "name": "Name", "role": "Role", "description": "Compelling description" }}
  ]
}}
"#,
        original, edits
    )
}

pub fn slides_prompt(film: &FilmData, theme: &Theme, acts: &str, characters: &str) -> String {
    format!(
        r#"
Create a professional pitch deck for producers with these slides:

Film: {}
Genre: {}
Synopsis: {}
3-Act Structure: {}
Characters: {}
Theme: {}
Core Themes: {}

Generate content for the following slides matching standard industry format.
Return strictly as a JSON object with this structure:
{{
  "titleSlide": {{ "title": "Title", "tagline": "Powerful Tagline" }},
  "loglineSlide": {{ "logline": "Logline content" }},
  "storySummarySlide": {{
      "act1": "Act 1 summary (Setup)",
      "act2": "Act 2 summary (Conflict)",
      "act3": "Act 3 summary (Resolution)"
  }},
  "characterSlides": [
    {{ "name": "Char Name", "role": "Role", "description": "Description" }}
  ],
  "themesSlide": {{ "title": "Themes & Message", "content": "Description of underlying themes" }},
  "visualStyleSlide": {{ "title": "Visual Style", "content": "Textual description of look/feel" }},
  "targetAudienceSlide": {{ "title": "Target Audience", "content": "Demographics and psychographics" }},
  "comparablesSlide": {{ "title": "Comparables", "content": "Similar successful projects" }},
  "budgetSlide": {{ "title": "Estimated Budget", "content": "Estimated range based on scope (Low/Mid/High) with reasoning" }},
  "whyWorkSlide": {{ "title": "Why This Film Will Work", "content": "Compelling argument for potential success" }}
}}
"#,
        film.title, film.genre, film.synopsis, acts, characters, theme.mood, film.themes
    )
}

/// Brace-scans an extraction reply and parses the recovered object.
pub fn parse_film_data(reply: &str) -> Result<FilmData, ExtractionError> {
    let json = extract_json_object(reply)?;
    serde_json::from_str(json).map_err(|e| {
        error!("JSON parsing error: {}", e);
        error!("Attempted to parse: {}", json);
        ExtractionError::MalformedJson {
            snippet: json.to_string(),
            reason: e.to_string(),
        }
    })
}

#[derive(Deserialize)]
struct RefinedCharacters {
    characters: Vec<Character>,
}

pub fn parse_refined_characters(reply: &str) -> Result<Vec<Character>, PipelineError> {
    let clean_json = strip_code_blocks(reply);
    let refined: RefinedCharacters = serde_json::from_str(&clean_json).map_err(|e| {
        error!("Failed to parse refined characters: {}. Body: {}", e, clean_json);
        PipelineError::Refinement(e.to_string())
    })?;
    Ok(refined.characters)
}

pub fn parse_slide_content(reply: &str) -> Result<SlideContent, PipelineError> {
    let clean_json = strip_code_blocks(reply);
    let value: serde_json::Value = serde_json::from_str(&clean_json).map_err(|e| {
        error!("Failed to parse slide content: {}. Body: {}", e, clean_json);
        PipelineError::Generation(e.to_string())
    })?;

    match validate_slide_content(value) {
        Ok(SchemaCheck::Valid(content)) => Ok(content),
        Ok(SchemaCheck::MissingFields(fields)) => {
            error!("Slide content is missing fields: {:?}", fields);
            Err(PipelineError::SchemaGap(fields))
        }
        Err(e) => Err(PipelineError::Generation(e.to_string())),
    }
}

/// Drives the three model-backed stages. Each call is independent.
pub struct Pipeline<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> Pipeline<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    async fn call(
        &self,
        stage: &str,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, PipelineError> {
        info!("{}: calling language model", stage);
        let reply = self.llm.generate(prompt, attachment).await.map_err(|e| {
            error!("{}: model call failed: {:#}", stage, e);
            PipelineError::ModelCall(format!("{:#}", e))
        })?;
        debug!("{}: raw response: {}", stage, reply);
        Ok(reply)
    }

    pub async fn extract_film_data(&self, document: &Document) -> Result<FilmData, PipelineError> {
        if document.bytes.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }
        let attachment = Attachment::new(document.media_type.clone(), document.bytes.clone());
        let reply = self
            .call("extract", EXTRACTION_PROMPT, Some(&attachment))
            .await?;

        let film = parse_film_data(&reply)?;
        info!(
            "extract: '{}' with {} characters",
            film.title,
            film.characters.len()
        );
        Ok(film)
    }

    pub async fn refine_characters(
        &self,
        extracted: &FilmData,
        user_edits: &[Character],
    ) -> Result<Vec<Character>, PipelineError> {
        let original = serde_json::to_string(&extracted.characters)
            .map_err(|e| PipelineError::Refinement(e.to_string()))?;
        let edits = serde_json::to_string(user_edits)
            .map_err(|e| PipelineError::Refinement(e.to_string()))?;

        let reply = self
            .call("refine", &refinement_prompt(&original, &edits), None)
            .await?;
        parse_refined_characters(&reply)
    }

    pub async fn generate_slide_content(
        &self,
        film: &FilmData,
        theme: &Theme,
    ) -> Result<SlideContent, PipelineError> {
        let acts = serde_json::to_string(&film.story_summary)
            .map_err(|e| PipelineError::Generation(e.to_string()))?;
        let characters = serde_json::to_string(&film.characters)
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        let reply = self
            .call("slides", &slides_prompt(film, theme, &acts, &characters), None)
            .await?;
        parse_slide_content(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlmClient;
    use crate::model::fixtures;

    pub const LAST_STAR_DOC: &str = "Title: The Last Star\nGenre: Sci-Fi\nLogline: A starship captain fights to save the last sun.\nSynopsis: Captain Aara discovers the sun is dying. She rallies a crew. They sacrifice the ship to reignite the star.\nCharacters: Aara - Brave Captain. Kael - Loyal Engineer.\nTone: Dark, Epic.\nTarget Audience: Sci-Fi fans.";

    fn text_document(text: &str) -> Document {
        Document {
            bytes: text.as_bytes().to_vec(),
            media_type: "text/plain".to_string(),
            file_name: Some("test-doc.txt".to_string()),
        }
    }

    fn film_json() -> String {
        serde_json::to_string_pretty(&fixtures::film()).unwrap()
    }

    #[tokio::test]
    async fn test_extract_end_to_end_with_commentary() {
        let reply = format!(
            "Here is the structured analysis you asked for:\n```json\n{}\n```\nLet me know!",
            film_json()
        );
        let llm = MockLlmClient::new().reply_to("Analyze this film", &reply);

        let film = Pipeline::new(&llm)
            .extract_film_data(&text_document(LAST_STAR_DOC))
            .await
            .unwrap();

        assert_eq!(film.title, "The Last Star");
        let names: Vec<&str> = film.characters.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Aara"));
        assert!(names.contains(&"Kael"));

        let value = serde_json::to_value(&film).unwrap();
        for field in [
            "title",
            "logline",
            "genre",
            "synopsis",
            "storySummary",
            "characters",
            "tone",
            "targetAudience",
            "themes",
        ] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }

        let call = llm.last_call();
        let attachment = call.attachment.expect("document should be attached");
        assert_eq!(attachment.mime_type, "text/plain");
        assert_eq!(attachment.data, LAST_STAR_DOC.as_bytes());
        assert!(call.prompt.contains("\"storySummary\""));
    }

    #[tokio::test]
    async fn test_extract_rejects_empty_document() {
        let llm = MockLlmClient::new();
        let result = Pipeline::new(&llm)
            .extract_film_data(&text_document(""))
            .await;

        assert!(matches!(result, Err(PipelineError::EmptyDocument)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extract_without_json_object() {
        let llm = MockLlmClient::new().reply_to("Analyze", "Sorry, I cannot read this file.");
        let result = Pipeline::new(&llm)
            .extract_film_data(&text_document(LAST_STAR_DOC))
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::Extraction(ExtractionError::NoJsonObject))
        ));
    }

    #[tokio::test]
    async fn test_extract_malformed_json_keeps_snippet() {
        let llm = MockLlmClient::new().reply_to("Analyze", "Result: {\"title\": \"X\",} done");
        let result = Pipeline::new(&llm)
            .extract_film_data(&text_document(LAST_STAR_DOC))
            .await;

        match result {
            Err(PipelineError::Extraction(ExtractionError::MalformedJson { snippet, .. })) => {
                assert_eq!(snippet, "{\"title\": \"X\",}");
            }
            other => panic!("expected malformed JSON, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_missing_field_is_malformed() {
        let mut value = serde_json::to_value(fixtures::film()).unwrap();
        value.as_object_mut().unwrap().remove("tone");
        let llm = MockLlmClient::new().reply_to("Analyze", &value.to_string());

        let result = Pipeline::new(&llm)
            .extract_film_data(&text_document(LAST_STAR_DOC))
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::Extraction(ExtractionError::MalformedJson { .. }))
        ));
    }

    #[tokio::test]
    async fn test_model_failure_is_terminal() {
        let llm = MockLlmClient::new();
        let result = Pipeline::new(&llm)
            .extract_film_data(&text_document(LAST_STAR_DOC))
            .await;

        assert!(matches!(result, Err(PipelineError::ModelCall(_))));
        assert_eq!(llm.call_count(), 1, "no retry expected");
    }

    #[tokio::test]
    async fn test_refine_characters_with_fence() {
        let reply = "```json\n{\"characters\": [{\"name\": \"Aara\", \"role\": \"Captain\", \"description\": \"A brave leader. She never quits.\"}]}\n```";
        let llm = MockLlmClient::new().reply_to("Update the character list", reply);
        let film = fixtures::film();
        let edits = vec![fixtures::character("Aara", "Captain")];

        let characters = Pipeline::new(&llm)
            .refine_characters(&film, &edits)
            .await
            .unwrap();

        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].description, "A brave leader. She never quits.");

        let prompt = llm.last_call().prompt;
        assert!(prompt.contains("Original characters: [{\"name\":\"Aara\""));
        assert!(prompt.contains("User corrections/notes: [{\"name\":\"Aara\""));
        assert!(prompt.contains("pitch-ready"));
    }

    #[tokio::test]
    async fn test_refine_characters_without_fence() {
        let reply = r#"{"characters": [{"name": "Kael", "role": "Engineer", "description": "Loyal."}]}"#;
        let llm = MockLlmClient::new().reply_to("Update the character list", reply);

        let characters = Pipeline::new(&llm)
            .refine_characters(&fixtures::film(), &[])
            .await
            .unwrap();
        assert_eq!(characters[0].name, "Kael");
    }

    #[test]
    fn test_refine_does_not_brace_scan() {
        let reply = "Here are the refined characters: {\"characters\": []}";
        assert!(matches!(
            parse_refined_characters(reply),
            Err(PipelineError::Refinement(_))
        ));
        // The extraction strategy would have recovered the same object.
        assert!(extract_json_object(reply).is_ok());
    }

    #[test]
    fn test_refine_requires_characters_field() {
        let result = parse_refined_characters(r#"{"cast": []}"#);
        match result {
            Err(PipelineError::Refinement(msg)) => assert!(msg.contains("characters")),
            other => panic!("expected refinement error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_slide_content_prompt_and_parse() {
        let reply = format!(
            "```json\n{}\n```",
            serde_json::to_string_pretty(&fixtures::slide_content()).unwrap()
        );
        let llm = MockLlmClient::new().reply_to("Create a professional pitch deck", &reply);

        let content = Pipeline::new(&llm)
            .generate_slide_content(&fixtures::film(), &Theme::default())
            .await
            .unwrap();
        assert_eq!(content, fixtures::slide_content());

        let prompt = llm.last_call().prompt;
        assert!(prompt.contains("Film: The Last Star"));
        assert!(prompt.contains("Genre: Sci-Fi"));
        assert!(prompt.contains("3-Act Structure: {\"act1\":"));
        assert!(prompt.contains("Theme: Cinematic & Professional"));
        assert!(prompt.contains("Core Themes: Sacrifice and hope"));
        assert!(llm.last_call().attachment.is_none());
    }

    #[tokio::test]
    async fn test_generate_slide_content_schema_gap() {
        let mut value = serde_json::to_value(fixtures::slide_content()).unwrap();
        value.as_object_mut().unwrap().remove("comparablesSlide");
        let llm = MockLlmClient::new().reply_to("pitch deck", &value.to_string());

        let result = Pipeline::new(&llm)
            .generate_slide_content(&fixtures::film(), &Theme::default())
            .await;
        match result {
            Err(PipelineError::SchemaGap(fields)) => {
                assert_eq!(fields, vec!["comparablesSlide".to_string()])
            }
            other => panic!("expected schema gap, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_rejects_non_json() {
        assert!(matches!(
            parse_slide_content("I'd be happy to help with your pitch deck!"),
            Err(PipelineError::Generation(_))
        ));
    }
}
