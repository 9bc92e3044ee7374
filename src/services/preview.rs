use crate::services::editor::FieldSet;
use std::fmt;

pub const PLACEHOLDER: &str = "Your script preview will appear here...";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewBlock {
    /// Centered script title.
    Title(String),
    SectionHeading(String),
    /// Text with its line breaks kept as separate lines.
    Paragraph(Vec<String>),
    ListItem(String),
    Dialogue { character: String, lines: Vec<String> },
    Divider,
    /// Muted hint shown when there is nothing to preview.
    Placeholder(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub blocks: Vec<PreviewBlock>,
    pub export_enabled: bool,
}

impl Default for Preview {
    fn default() -> Self {
        Self {
            blocks: vec![PreviewBlock::Placeholder(PLACEHOLDER.to_string())],
            export_enabled: false,
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

pub fn render(fields: &FieldSet) -> Preview {
    let mut blocks = Vec::new();

    if !fields.title.trim().is_empty() {
        blocks.push(PreviewBlock::Title(fields.title.clone()));
    }

    if !fields.scenario.trim().is_empty() {
        blocks.push(PreviewBlock::SectionHeading("Scenario".to_string()));
        blocks.push(PreviewBlock::Paragraph(split_lines(&fields.scenario)));
        blocks.push(PreviewBlock::Divider);
    }

    let characters = fields.filled_characters();
    if !characters.is_empty() {
        blocks.push(PreviewBlock::SectionHeading("Characters".to_string()));
        blocks.extend(characters.into_iter().map(PreviewBlock::ListItem));
        blocks.push(PreviewBlock::Divider);
    }

    let dialogues: Vec<_> = fields
        .dialogues()
        .iter()
        .filter(|e| !e.text.trim().is_empty())
        .collect();
    if !dialogues.is_empty() {
        blocks.push(PreviewBlock::SectionHeading("Dialogues".to_string()));
        for entry in dialogues {
            blocks.push(PreviewBlock::Dialogue {
                character: entry.character().to_string(),
                lines: split_lines(&entry.text),
            });
        }
    }

    if blocks.is_empty() {
        return Preview::default();
    }

    Preview {
        blocks,
        export_enabled: true,
    }
}

impl fmt::Display for PreviewBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewBlock::Title(title) => writeln!(f, "{:^60}", title),
            PreviewBlock::SectionHeading(heading) => writeln!(f, "== {} ==", heading),
            PreviewBlock::Paragraph(lines) => {
                for line in lines {
                    writeln!(f, "{}", line)?;
                }
                Ok(())
            }
            PreviewBlock::ListItem(item) => writeln!(f, "  • {}", item),
            PreviewBlock::Dialogue { character, lines } => {
                let mut lines = lines.iter();
                writeln!(f, "{}: {}", character, lines.next().map_or("", |l| l.as_str()))?;
                for line in lines {
                    writeln!(f, "    {}", line)?;
                }
                Ok(())
            }
            PreviewBlock::Divider => writeln!(f, "{}", "-".repeat(60)),
            PreviewBlock::Placeholder(text) => writeln!(f, "({})", text),
        }
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}
