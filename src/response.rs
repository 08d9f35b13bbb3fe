//! Recovery of JSON payloads from free-text model replies.
//!
//! The extraction stage scans for the outermost braces. The refinement and
//! slide stages only strip a surrounding code fence.

use crate::error::ExtractionError;
use crate::model::SlideContent;
use serde_json::{Map, Value};

/// Returns the text between the first `{` and the last `}` of `reply`.
pub fn extract_json_object(reply: &str) -> Result<&str, ExtractionError> {
    let start = reply.find('{').ok_or(ExtractionError::NoJsonObject)?;
    let end = reply.rfind('}').ok_or(ExtractionError::NoJsonObject)?;
    if end < start {
        return Err(ExtractionError::NoJsonObject);
    }
    Ok(&reply[start..=end])
}

/// Strips a leading ```` ```json ```` (or bare ```` ``` ````) fence and a trailing
/// ```` ``` ```` fence. Unfenced text is only trimmed.
pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json").trim_end_matches("```").trim().to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```").trim_end_matches("```").trim().to_string()
    } else {
        s.to_string()
    }
}

/// Outcome of checking a parsed reply against the ten-slot slide schema.
#[derive(Debug)]
pub enum SchemaCheck {
    Valid(SlideContent),
    MissingFields(Vec<String>),
}

enum Slot {
    Fields(&'static [&'static str]),
    Characters,
}

const SECTION: &[&str] = &["title", "content"];
const CHARACTER: &[&str] = &["name", "role", "description"];

const SLIDE_SCHEMA: &[(&str, Slot)] = &[
    ("titleSlide", Slot::Fields(&["title", "tagline"])),
    ("loglineSlide", Slot::Fields(&["logline"])),
    ("storySummarySlide", Slot::Fields(&["act1", "act2", "act3"])),
    ("characterSlides", Slot::Characters),
    ("themesSlide", Slot::Fields(SECTION)),
    ("visualStyleSlide", Slot::Fields(SECTION)),
    ("targetAudienceSlide", Slot::Fields(SECTION)),
    ("comparablesSlide", Slot::Fields(SECTION)),
    ("budgetSlide", Slot::Fields(SECTION)),
    ("whyWorkSlide", Slot::Fields(SECTION)),
];

fn is_absent(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).map_or(true, Value::is_null)
}

fn missing_in(object: &Value, fields: &[&str], path: &str, missing: &mut Vec<String>) {
    // Wrong types are left for deserialization to report.
    if let Some(map) = object.as_object() {
        for field in fields {
            if is_absent(map, field) {
                missing.push(format!("{}.{}", path, field));
            }
        }
    }
}

/// Checks that every slot and slot field is present, then converts the value.
///
/// Absent or `null` entries are collected as dotted paths. A present entry of the
/// wrong type is returned as a deserialization error.
pub fn validate_slide_content(value: Value) -> Result<SchemaCheck, serde_json::Error> {
    let mut missing = Vec::new();

    if let Some(root) = value.as_object() {
        for (slot, shape) in SLIDE_SCHEMA {
            if is_absent(root, slot) {
                missing.push(slot.to_string());
                continue;
            }
            let slot_value = &root[*slot];
            match shape {
                Slot::Fields(fields) => missing_in(slot_value, fields, slot, &mut missing),
                Slot::Characters => {
                    if let Some(characters) = slot_value.as_array() {
                        for (i, character) in characters.iter().enumerate() {
                            let path = format!("{}[{}]", slot, i);
                            missing_in(character, CHARACTER, &path, &mut missing);
                        }
                    }
                }
            }
        }
    }

    if !missing.is_empty() {
        return Ok(SchemaCheck::MissingFields(missing));
    }
    serde_json::from_value(value).map(SchemaCheck::Valid)
}
