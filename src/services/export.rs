use crate::core::error::{ScriptError, ScriptResult};
use crate::core::state::{DialogueLine, Script};
use crate::services::editor::FieldSet;
use crate::utils::pdf;
use serde::{Deserialize, Serialize};

pub const UNTITLED: &str = "Untitled Script";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    /// Cursor position at the top of every page.
    pub top: f32,
    pub margin_left: f32,
    pub list_indent: f32,
    pub wrap_width: f32,
    pub line_height: f32,
    pub title_gap: f32,
    pub heading_gap: f32,
    pub dialogue_heading_gap: f32,
    pub section_gap: f32,
    pub list_gap: f32,
    pub body_break: f32,
    pub list_break: f32,
    pub dialogue_break: f32,
    pub title_size: f32,
    pub heading_size: f32,
    pub body_size: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            top: 20.0,
            margin_left: 20.0,
            list_indent: 25.0,
            wrap_width: 170.0,
            line_height: 7.0,
            title_gap: 15.0,
            heading_gap: 10.0,
            dialogue_heading_gap: 15.0,
            section_gap: 10.0,
            list_gap: 5.0,
            body_break: 270.0,
            list_break: 270.0,
            dialogue_break: 250.0,
            title_size: 20.0,
            heading_size: 14.0,
            body_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontStyle {
    pub size: f32,
    pub bold: bool,
}

impl FontStyle {
    pub fn regular(size: f32) -> Self {
        Self { size, bold: false }
    }

    pub fn bold(size: f32) -> Self {
        Self { size, bold: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font: FontStyle,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub blocks: Vec<TextBlock>,
}

/// Wraps text into lines no wider than `max_width`.
pub trait TextLayout {
    fn split_text_to_size(
        &self,
        text: &str,
        max_width: f32,
        font: FontStyle,
    ) -> anyhow::Result<Vec<String>>;
}

/// What gets printed, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContent {
    pub title: String,
    pub scenario: String,
    pub characters: Vec<String>,
    pub dialogues: Vec<DialogueLine>,
}

impl ScriptContent {
    pub fn from_fields(fields: &FieldSet) -> Self {
        Self {
            title: fields.title.trim().to_string(),
            scenario: fields.scenario.trim().to_string(),
            characters: fields.filled_characters(),
            dialogues: fields.filled_dialogues(),
        }
    }

    pub fn from_script(script: &Script) -> Self {
        Self {
            title: script.title.clone(),
            scenario: script.scenario.clone(),
            characters: script.characters.clone(),
            dialogues: script.dialogues.clone(),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }
}

/// `My Film!` becomes `my_film__script.pdf`.
pub fn export_filename(title: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { UNTITLED } else { title };
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_script.pdf", stem)
}

struct Cursor<'a> {
    geometry: &'a PageGeometry,
    pages: Vec<Page>,
    y: f32,
}

impl<'a> Cursor<'a> {
    fn new(geometry: &'a PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::default()],
            y: geometry.top,
        }
    }

    fn break_past(&mut self, limit: f32) {
        if self.y > limit {
            log::debug!("Page break at y={} (limit {})", self.y, limit);
            self.pages.push(Page::default());
            self.y = self.geometry.top;
        }
    }

    fn place(&mut self, x: f32, text: impl Into<String>, font: FontStyle, align: Align) {
        let block = TextBlock {
            x,
            y: self.y,
            text: text.into(),
            font,
            align,
        };
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }

    fn advance(&mut self, by: f32) {
        self.y += by;
    }
}

fn wrap(layout: &dyn TextLayout, text: &str, width: f32, font: FontStyle) -> ScriptResult<Vec<String>> {
    layout
        .split_text_to_size(text, width, font)
        .map_err(|e| ScriptError::Layout(format!("{:#}", e)))
}

/// Lays the script out into pages of positioned text.
///
/// Coordinates are millimetres from the top-left corner of the page. The
/// cursor moves down one line pitch per wrapped line; each section checks
/// its own threshold before placing content and starts a new page when the
/// cursor has passed it.
pub fn paginate(
    content: &ScriptContent,
    geometry: &PageGeometry,
    layout: &dyn TextLayout,
) -> ScriptResult<Vec<Page>> {
    let g = geometry;
    let heading = FontStyle::bold(g.heading_size);
    let body = FontStyle::regular(g.body_size);
    let mut cursor = Cursor::new(g);

    cursor.place(
        g.page_width / 2.0,
        content.display_title(),
        FontStyle::bold(g.title_size),
        Align::Center,
    );
    cursor.advance(g.title_gap);

    if !content.scenario.trim().is_empty() {
        cursor.break_past(g.body_break);
        cursor.place(g.margin_left, "SCENARIO", heading, Align::Left);
        cursor.advance(g.heading_gap);

        for line in wrap(layout, &content.scenario, g.wrap_width, body)? {
            cursor.break_past(g.body_break);
            cursor.place(g.margin_left, line, body, Align::Left);
            cursor.advance(g.line_height);
        }
        cursor.advance(g.section_gap);
    }

    let characters: Vec<&String> = content
        .characters
        .iter()
        .filter(|c| !c.trim().is_empty())
        .collect();
    if !characters.is_empty() {
        cursor.break_past(g.list_break);
        cursor.place(g.margin_left, "CHARACTERS", heading, Align::Left);
        cursor.advance(g.heading_gap);

        for name in characters {
            cursor.break_past(g.list_break);
            cursor.place(g.list_indent, format!("• {}", name), body, Align::Left);
            cursor.advance(g.line_height);
        }
        cursor.advance(g.list_gap);
    }

    let dialogues: Vec<&DialogueLine> = content
        .dialogues
        .iter()
        .filter(|d| !d.text.trim().is_empty())
        .collect();
    if !dialogues.is_empty() {
        cursor.break_past(g.dialogue_break);
        cursor.place(g.margin_left, "DIALOGUES", heading, Align::Left);
        cursor.advance(g.dialogue_heading_gap);

        for dialogue in dialogues {
            cursor.break_past(g.dialogue_break);
            cursor.place(
                g.margin_left,
                format!("{}:", dialogue.character.to_uppercase()),
                FontStyle::bold(g.body_size),
                Align::Left,
            );
            cursor.advance(g.line_height);

            for line in wrap(layout, dialogue.text.trim(), g.wrap_width, body)? {
                cursor.break_past(g.body_break);
                cursor.place(g.list_indent, line, body, Align::Left);
                cursor.advance(g.line_height);
            }
            cursor.advance(g.section_gap);
        }
    }

    log::info!(
        "Paginated '{}' into {} page(s)",
        content.display_title(),
        cursor.pages.len()
    );
    Ok(cursor.pages)
}

#[derive(Debug, Clone)]
pub struct ExportedPdf {
    pub file_name: String,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

/// Lays out and serializes the whole document before anything is returned.
pub fn export(
    content: &ScriptContent,
    geometry: &PageGeometry,
    layout: &dyn TextLayout,
) -> ScriptResult<ExportedPdf> {
    let pages = paginate(content, geometry, layout)?;
    let bytes = pdf::write_pdf(&pages, geometry)
        .map_err(|e| ScriptError::Layout(format!("Failed to serialize PDF: {:#}", e)))?;
    Ok(ExportedPdf {
        file_name: export_filename(&content.title),
        page_count: pages.len(),
        bytes,
    })
}
