//! Ten-slide pitch deck layout.
//!
//! [`render_deck`] is a pure function from film data, theme and slide prose to a
//! [`Deck`]: positioned text boxes and shapes on a 16:9 canvas measured in
//! inches. [`pptx::write_pptx`] turns that layout into a presentation file.

pub mod pptx;

use crate::error::PipelineError;
use crate::model::{FilmData, SectionSlide, SlideContent, Theme};
use log::warn;
use serde::Serialize;

pub const SLIDE_WIDTH: f64 = 10.0;
pub const SLIDE_HEIGHT: f64 = 5.625;

pub const TITLE_FONT: &str = "Arial";
pub const BODY_FONT: &str = "Calibri";
pub const TEXT_COLOR: &str = "333333";
pub const DARK_BACKGROUND: &str = "111111";

pub const DEFAULT_PRIMARY: &str = "111111";
pub const DEFAULT_SECONDARY: &str = "666666";
pub const DEFAULT_ACCENT: &str = "D4AF37";

pub const MAX_CHARACTERS: usize = 3;
pub const CHARACTER_ROW_HEIGHT: f64 = 1.2;
pub const TONE_CHIP_SPACING: f64 = 1.5;

pub const AUTHOR: &str = "AI Pitch Deck Generator";
pub const COMPANY: &str = "Indie Producer";

const FOOTER_GRAY: &str = "999999";
const LIGHT_TEXT: &str = "E0E0E0";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Palette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub text: String,
}

/// Accepts `RRGGBB` with an optional leading `#`; anything else is rejected.
fn hex_color(raw: &str) -> Option<String> {
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_string())
    } else {
        if !raw.is_empty() {
            warn!("Ignoring theme color '{}': expected six hex digits", raw);
        }
        None
    }
}

fn theme_color(colors: &[String], index: usize, default: &str) -> String {
    colors
        .get(index)
        .and_then(|c| hex_color(c))
        .unwrap_or_else(|| default.to_string())
}

impl Palette {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            primary: theme_color(&theme.primary_colors, 0, DEFAULT_PRIMARY),
            secondary: theme_color(&theme.secondary_colors, 0, DEFAULT_SECONDARY),
            accent: theme_color(&theme.secondary_colors, 1, DEFAULT_ACCENT),
            text: TEXT_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
    pub frame: Frame,
    pub text: String,
    pub font_face: String,
    pub font_size: u32,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub align: Align,
    pub char_spacing: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Line,
    Rect,
    RoundRect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub kind: ShapeKind,
    pub frame: Frame,
    pub fill: Option<String>,
    pub line: Option<LineStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Element {
    Text(TextBox),
    Shape(Shape),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub background: Option<String>,
    pub elements: Vec<Element>,
}

impl Slide {
    pub fn texts(&self) -> impl Iterator<Item = &TextBox> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text(t) => Some(t),
            Element::Shape(_) => None,
        })
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.elements.iter().filter_map(|e| match e {
            Element::Shape(s) => Some(s),
            Element::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deck {
    pub title: String,
    pub author: String,
    pub company: String,
    pub palette: Palette,
    pub slides: Vec<Slide>,
}

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn deck_file_name(title: &str) -> String {
    format!("{}_StandardDeck.pptx", sanitize_title(title))
}

fn text(frame: Frame, text: impl Into<String>, font_size: u32, color: &str) -> TextBox {
    TextBox {
        frame,
        text: text.into(),
        font_face: BODY_FONT.to_string(),
        font_size,
        color: color.to_string(),
        bold: false,
        italic: false,
        align: Align::Left,
        char_spacing: None,
    }
}

impl TextBox {
    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    fn font(mut self, face: &str) -> Self {
        self.font_face = face.to_string();
        self
    }

    fn spacing(mut self, points: u32) -> Self {
        self.char_spacing = Some(points);
        self
    }
}

fn line(frame: Frame, color: &str, width: f64) -> Shape {
    Shape {
        kind: ShapeKind::Line,
        frame,
        fill: None,
        line: Some(LineStyle {
            color: color.to_string(),
            width,
        }),
    }
}

struct SlideBuilder {
    slide: Slide,
}

impl SlideBuilder {
    fn new() -> Self {
        Self {
            slide: Slide {
                background: None,
                elements: Vec::new(),
            },
        }
    }

    fn dark() -> Self {
        let mut builder = Self::new();
        builder.slide.background = Some(DARK_BACKGROUND.to_string());
        builder
    }

    fn text(&mut self, text: TextBox) -> &mut Self {
        self.slide.elements.push(Element::Text(text));
        self
    }

    fn shape(&mut self, shape: Shape) -> &mut Self {
        self.slide.elements.push(Element::Shape(shape));
        self
    }

    fn finish(self) -> Slide {
        self.slide
    }
}

struct Layout<'a> {
    film: &'a FilmData,
    theme: &'a Theme,
    content: &'a SlideContent,
    palette: Palette,
}

impl<'a> Layout<'a> {
    fn footer(&self, slide: &mut SlideBuilder, page: usize) {
        slide
            .shape(line(Frame::new(0.5, 5.2, 9.0, 0.0), LIGHT_TEXT, 1.0))
            .text(
                text(
                    Frame::new(0.5, 5.3, 6.0, 0.25),
                    self.film.title.to_uppercase(),
                    8,
                    FOOTER_GRAY,
                )
                .bold(),
            )
            .text(
                text(Frame::new(9.2, 5.3, 0.3, 0.25), page.to_string(), 8, FOOTER_GRAY)
                    .align(Align::Right),
            );
    }

    fn header(&self, slide: &mut SlideBuilder, title: &str, subtitle: &str, title_color: &str) {
        slide
            .text(
                text(
                    Frame::new(0.5, 0.4, 9.0, 0.3),
                    subtitle.to_uppercase(),
                    10,
                    &self.palette.accent,
                )
                .bold()
                .spacing(3),
            )
            .text(
                text(Frame::new(0.5, 0.8, 9.0, 0.6), title, 24, title_color)
                    .bold()
                    .font(TITLE_FONT),
            );
    }

    fn title_slide(&self) -> Slide {
        let mut slide = SlideBuilder::dark();
        slide
            .text(
                text(
                    Frame::new(0.5, 1.5, 9.0, 1.0),
                    self.content.title_slide.title.to_uppercase(),
                    48,
                    "FFFFFF",
                )
                .bold()
                .align(Align::Center)
                .font(TITLE_FONT),
            )
            .shape(line(Frame::new(3.0, 2.8, 4.0, 0.0), &self.palette.accent, 2.0))
            .text(
                text(
                    Frame::new(1.0, 3.2, 8.0, 1.0),
                    self.content.logline_slide.logline.as_str(),
                    20,
                    LIGHT_TEXT,
                )
                .italic()
                .align(Align::Center),
            );
        slide.finish()
    }

    fn genre_slide(&self, page: usize) -> Slide {
        let mut slide = SlideBuilder::new();
        self.footer(&mut slide, page);
        self.header(&mut slide, "Genre & Tone", "Atmosphere", &self.palette.primary);

        slide
            .text(text(Frame::new(0.5, 1.8, 4.0, 0.3), "GENRE", 14, &self.palette.secondary).bold())
            .text(text(
                Frame::new(0.5, 2.1, 4.0, 0.6),
                self.film.genre.as_str(),
                24,
                &self.palette.text,
            ))
            .text(
                text(Frame::new(5.0, 1.8, 4.0, 0.3), "TONE KEYWORDS", 14, &self.palette.secondary)
                    .bold(),
            );

        // One chip per keyword, no wrapping: long tone lists run off the canvas.
        for (i, tone) in self.film.tone.iter().enumerate() {
            let frame = Frame::new(5.0 + i as f64 * TONE_CHIP_SPACING, 2.1, 1.4, 0.5);
            slide
                .shape(Shape {
                    kind: ShapeKind::RoundRect,
                    frame,
                    fill: Some("F0F0F0".to_string()),
                    line: Some(LineStyle {
                        color: "CCCCCC".to_string(),
                        width: 1.0,
                    }),
                })
                .text(text(frame, tone.as_str(), 10, "555555").align(Align::Center));
        }
        slide.finish()
    }

    fn story_slide(&self, page: usize) -> Slide {
        let acts = &self.content.story_summary_slide;
        let mut slide = SlideBuilder::new();
        self.footer(&mut slide, page);
        self.header(&mut slide, "Story Summary", "Narrative Arc", &self.palette.primary);
        slide.text(text(
            Frame::new(0.5, 1.8, 9.0, 3.2),
            format!("{}\n\n{}\n\n{}", acts.act1, acts.act2, acts.act3),
            12,
            &self.palette.text,
        ));
        slide.finish()
    }

    fn characters_slide(&self, page: usize) -> Slide {
        let mut slide = SlideBuilder::new();
        self.footer(&mut slide, page);
        self.header(&mut slide, "Key Characters", "Cast", &self.palette.primary);

        let characters = &self.content.character_slides;
        if characters.len() > MAX_CHARACTERS {
            warn!(
                "Characters slide shows {} of {} characters",
                MAX_CHARACTERS,
                characters.len()
            );
        }

        for (idx, character) in characters.iter().take(MAX_CHARACTERS).enumerate() {
            let y = 1.5 + idx as f64 * CHARACTER_ROW_HEIGHT;
            slide
                .text(
                    text(
                        Frame::new(0.5, y, 3.0, 0.3),
                        character.name.to_uppercase(),
                        16,
                        &self.palette.primary,
                    )
                    .bold(),
                )
                .text(
                    text(
                        Frame::new(0.5, y + 0.3, 3.0, 0.3),
                        character.role.as_str(),
                        11,
                        &self.palette.secondary,
                    )
                    .italic(),
                )
                .text(text(
                    Frame::new(3.5, y, 6.0, 1.1),
                    character.description.as_str(),
                    12,
                    &self.palette.text,
                ));
        }
        slide.finish()
    }

    fn section_slide(&self, section: &SectionSlide, subtitle: &str, page: usize) -> Slide {
        let mut slide = SlideBuilder::new();
        self.footer(&mut slide, page);
        self.header(&mut slide, &section.title, subtitle, &self.palette.primary);
        slide.text(text(
            Frame::new(0.5, 1.8, 9.0, 3.2),
            section.content.as_str(),
            14,
            &self.palette.text,
        ));
        slide.finish()
    }

    fn visual_style_slide(&self) -> Slide {
        let section = &self.content.visual_style_slide;
        let mut slide = SlideBuilder::dark();
        self.header(&mut slide, &section.title, "Look & Feel", "FFFFFF");
        slide.text(text(
            Frame::new(0.5, 1.8, 9.0, 2.3),
            section.content.as_str(),
            14,
            LIGHT_TEXT,
        ));

        let swatches = self
            .theme
            .primary_colors
            .iter()
            .chain(self.theme.secondary_colors.iter())
            .filter_map(|c| hex_color(c));
        for (i, color) in swatches.enumerate() {
            slide.shape(Shape {
                kind: ShapeKind::Rect,
                frame: Frame::new(0.5 + i as f64 * 0.8, 4.3, 0.6, 0.6),
                fill: Some(color),
                line: Some(LineStyle {
                    color: "444444".to_string(),
                    width: 0.5,
                }),
            });
        }
        slide.finish()
    }
}

/// Lays out the standard ten-slide deck.
pub fn render_deck(film: &FilmData, theme: &Theme, content: &SlideContent) -> Deck {
    let layout = Layout {
        film,
        theme,
        content,
        palette: Palette::from_theme(theme),
    };

    let slides = vec![
        layout.title_slide(),
        layout.genre_slide(2),
        layout.story_slide(3),
        layout.characters_slide(4),
        layout.section_slide(&content.themes_slide, "Meaning", 5),
        layout.visual_style_slide(),
        layout.section_slide(&content.target_audience_slide, "Market", 7),
        layout.section_slide(&content.comparables_slide, "Comparables", 8),
        layout.section_slide(&content.budget_slide, "Financials", 9),
        layout.section_slide(&content.why_work_slide, "The Opportunity", 10),
    ];

    Deck {
        title: film.title.clone(),
        author: AUTHOR.to_string(),
        company: COMPANY.to_string(),
        palette: layout.palette,
        slides,
    }
}

/// A rendered deck ready for download or a local write.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn build_presentation(
    film: &FilmData,
    theme: &Theme,
    content: &SlideContent,
) -> Result<Presentation, PipelineError> {
    let deck = render_deck(film, theme, content);
    let bytes = pptx::write_pptx(&deck).map_err(|e| PipelineError::Render(format!("{:#}", e)))?;
    Ok(Presentation {
        file_name: deck_file_name(&film.title),
        bytes,
    })
}
