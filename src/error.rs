use thiserror::Error;

/// Failures of the brace-scan recovery used on extraction replies.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no JSON object in response")]
    NoJsonObject,
    #[error("malformed JSON: {reason}")]
    MalformedJson { snippet: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no file uploaded")]
    UploadMissing,
    #[error("upload could not be read: {0}")]
    Upload(String),
    #[error("document is empty")]
    EmptyDocument,
    #[error("model call failed: {0}")]
    ModelCall(String),
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("failed to parse refined characters: {0}")]
    Refinement(String),
    #[error("failed to parse slide content: {0}")]
    Generation(String),
    #[error("slide content is missing required fields: {}", .0.join(", "))]
    SchemaGap(Vec<String>),
    #[error("failed to render deck: {0}")]
    Render(String),
}

impl PipelineError {
    /// Whether the failure was caused by the request rather than the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::UploadMissing | PipelineError::Upload(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_variant_format() {
        let err: PipelineError = ExtractionError::NoJsonObject.into();
        assert_eq!(err.to_string(), "extraction failed: no JSON object in response");

        let err: PipelineError = ExtractionError::MalformedJson {
            snippet: "{oops}".into(),
            reason: "key must be a string".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "extraction failed: malformed JSON: key must be a string"
        );
    }

    #[test]
    fn test_schema_gap_lists_fields() {
        let err = PipelineError::SchemaGap(vec![
            "budgetSlide".to_string(),
            "themesSlide.content".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "slide content is missing required fields: budgetSlide, themesSlide.content"
        );
    }

    #[test]
    fn test_only_upload_failures_are_client_errors() {
        assert!(PipelineError::UploadMissing.is_client_error());
        assert!(PipelineError::Upload("length limit exceeded".into()).is_client_error());
        assert!(!PipelineError::EmptyDocument.is_client_error());
        assert!(!PipelineError::ModelCall("timeout".into()).is_client_error());
        assert!(!PipelineError::SchemaGap(vec![]).is_client_error());
    }
}
