use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub role: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StorySummary {
    pub act1: String,
    pub act2: String,
    pub act3: String,
}

/// Film metadata handed from stage to stage. Every field is required.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilmData {
    pub title: String,
    pub logline: String,
    pub genre: String,
    pub synopsis: String,
    pub story_summary: StorySummary,
    pub characters: Vec<Character>,
    pub tone: Vec<String>,
    pub target_audience: String,
    pub themes: String,
}

impl FilmData {
    /// Replaces the cast with a refined one; everything else stays as extracted.
    pub fn with_characters(self, characters: Vec<Character>) -> Self {
        Self { characters, ..self }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_colors: Vec<String>,
    pub secondary_colors: Vec<String>,
    pub mood: String,
    pub font_styles: String,
    pub design_style: Vec<String>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_colors: vec!["#000000".to_string(), "#1A1A1A".to_string()],
            // Gold / silver accents
            secondary_colors: vec!["#D4AF37".to_string(), "#C0C0C0".to_string()],
            mood: "Cinematic & Professional".to_string(),
            font_styles: "Sans-serif".to_string(),
            design_style: vec!["Minimalist".to_string(), "Bold".to_string()],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TitleSlide {
    pub title: String,
    pub tagline: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LoglineSlide {
    pub logline: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SectionSlide {
    pub title: String,
    pub content: String,
}

/// Prose for the ten slots of the standard deck.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlideContent {
    pub title_slide: TitleSlide,
    pub logline_slide: LoglineSlide,
    pub story_summary_slide: StorySummary,
    pub character_slides: Vec<Character>,
    pub themes_slide: SectionSlide,
    pub visual_style_slide: SectionSlide,
    pub target_audience_slide: SectionSlide,
    pub comparables_slide: SectionSlide,
    pub budget_slide: SectionSlide,
    pub why_work_slide: SectionSlide,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn character(name: &str, role: &str) -> Character {
        Character {
            name: name.to_string(),
            role: role.to_string(),
            description: format!("{} description", name),
        }
    }

    pub fn film() -> FilmData {
        FilmData {
            title: "The Last Star".to_string(),
            logline: "A starship captain fights to save the last sun.".to_string(),
            genre: "Sci-Fi".to_string(),
            synopsis: "Captain Aara discovers the sun is dying.".to_string(),
            story_summary: StorySummary {
                act1: "Aara learns the sun is dying.".to_string(),
                act2: "She rallies a crew.".to_string(),
                act3: "They sacrifice the ship to reignite the star.".to_string(),
            },
            characters: vec![
                character("Aara", "Captain"),
                character("Kael", "Engineer"),
            ],
            tone: vec!["Dark".to_string(), "Epic".to_string()],
            target_audience: "Sci-Fi fans".to_string(),
            themes: "Sacrifice and hope".to_string(),
        }
    }

    fn section(title: &str) -> SectionSlide {
        SectionSlide {
            title: title.to_string(),
            content: format!("{} content", title),
        }
    }

    pub fn slide_content() -> SlideContent {
        SlideContent {
            title_slide: TitleSlide {
                title: "The Last Star".to_string(),
                tagline: "Light the dark.".to_string(),
            },
            logline_slide: LoglineSlide {
                logline: "A captain races to reignite a dying sun.".to_string(),
            },
            story_summary_slide: StorySummary {
                act1: "Setup".to_string(),
                act2: "Conflict".to_string(),
                act3: "Resolution".to_string(),
            },
            character_slides: vec![
                character("Aara", "Captain"),
                character("Kael", "Engineer"),
            ],
            themes_slide: section("Themes & Message"),
            visual_style_slide: section("Visual Style"),
            target_audience_slide: section("Target Audience"),
            comparables_slide: section("Comparables"),
            budget_slide: section("Estimated Budget"),
            why_work_slide: section("Why This Film Will Work"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_film_data_uses_camel_case_fields() {
        let json = serde_json::to_value(fixtures::film()).unwrap();
        assert!(json.get("storySummary").is_some());
        assert!(json.get("targetAudience").is_some());
        assert_eq!(json.as_object().unwrap().len(), 9);
    }

    #[test]
    fn test_film_data_missing_field_is_rejected() {
        let mut json = serde_json::to_value(fixtures::film()).unwrap();
        json.as_object_mut().unwrap().remove("themes");
        let result: Result<FilmData, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_with_characters_keeps_other_fields() {
        let film = fixtures::film();
        let refined = film
            .clone()
            .with_characters(vec![fixtures::character("Nova", "Pilot")]);

        assert_eq!(refined.characters.len(), 1);
        assert_eq!(refined.characters[0].name, "Nova");
        assert_eq!(refined.title, film.title);
        assert_eq!(refined.story_summary, film.story_summary);
    }

    #[test]
    fn test_default_theme_parses_from_ui_shape() {
        let json = r##"{
            "primaryColors": ["#000000", "#1A1A1A"],
            "secondaryColors": ["#D4AF37", "#C0C0C0"],
            "mood": "Cinematic & Professional",
            "fontStyles": "Sans-serif",
            "designStyle": ["Minimalist", "Bold"]
        }"##;
        let theme: Theme = serde_json::from_str(json).unwrap();
        assert_eq!(theme, Theme::default());
    }
}
