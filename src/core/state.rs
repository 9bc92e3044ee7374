use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// One persisted movie script, in the stored collection layout.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,
    #[serde(rename = "movieName")]
    pub title: String,
    pub scenario: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub dialogues: Vec<DialogueLine>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DialogueLine {
    /// Speaker name as it read when the line was attached.
    pub character: String,
    pub text: String,
}

impl DialogueLine {
    pub fn new(character: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            text: text.into(),
        }
    }
}

/// Validated script content without identity, as produced by a harvest.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ScriptDraft {
    pub title: String,
    pub scenario: String,
    pub characters: Vec<String>,
    pub dialogues: Vec<DialogueLine>,
}

impl ScriptDraft {
    pub fn into_script(self, id: String, last_modified: DateTime<Utc>) -> Script {
        Script {
            id,
            title: self.title,
            scenario: self.scenario,
            characters: self.characters,
            dialogues: self.dialogues,
            last_modified,
        }
    }
}

impl From<&Script> for ScriptDraft {
    fn from(script: &Script) -> Self {
        Self {
            title: script.title.clone(),
            scenario: script.scenario.clone(),
            characters: script.characters.clone(),
            dialogues: script.dialogues.clone(),
        }
    }
}

/// One line of the saved-scripts listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptSummary {
    pub id: String,
    pub title: String,
    pub characters: String,
    pub last_modified: String,
}

impl From<&Script> for ScriptSummary {
    fn from(script: &Script) -> Self {
        Self {
            id: script.id.clone(),
            title: script.title.clone(),
            characters: script.characters.join(", "),
            last_modified: script
                .last_modified
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

impl std::fmt::Display for ScriptSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | Characters: {} | Last modified: {}",
            self.title, self.characters, self.last_modified
        )
    }
}
