use crate::core::error::{ScriptError, ScriptResult};
use crate::core::state::{DialogueLine, Script, ScriptDraft};

pub const VALIDATION_MESSAGE: &str = "Please fill in all required fields: Movie Name and Scenario";

/// Stable handle to one dialogue entry within a field set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogueEntry {
    id: EntryId,
    character: String,
    pub text: String,
}

impl DialogueEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Speaker name captured at creation time.
    pub fn character(&self) -> &str {
        &self.character
    }
}

/// "Add dialogue" action offered for one character slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogueAction {
    pub index: usize,
    pub label: String,
}

/// Mirrors one script while it is being edited: title and scenario text, a
/// fixed number of character-name slots and an ordered list of dialogue
/// entries. Each entry captures its speaker's display name when it is
/// created; later edits to the slot do not reach it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub title: String,
    pub scenario: String,
    characters: Vec<String>,
    dialogues: Vec<DialogueEntry>,
    next_entry: u64,
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn characters(&self) -> &[String] {
        &self.characters
    }

    pub fn dialogues(&self) -> &[DialogueEntry] {
        &self.dialogues
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_scenario(&mut self, scenario: impl Into<String>) {
        self.scenario = scenario.into();
    }

    /// Regenerates `count` empty slots. Previous names are discarded, not resized.
    pub fn set_character_count(&mut self, count: usize) {
        log::debug!("Regenerating {} character slot(s)", count);
        self.characters = vec![String::new(); count];
    }

    pub fn set_character_name(&mut self, index: usize, name: impl Into<String>) -> ScriptResult<()> {
        let count = self.characters.len();
        let slot = self
            .characters
            .get_mut(index)
            .ok_or(ScriptError::InvalidSlot { index, count })?;
        *slot = name.into();
        Ok(())
    }

    fn slot_label(index: usize, name: &str) -> String {
        if is_blank(name) {
            format!("Character {}", index + 1)
        } else {
            name.trim().to_string()
        }
    }

    /// Display name of slot `index`, or `Character {index+1}` when the slot is blank.
    pub fn character_label(&self, index: usize) -> ScriptResult<String> {
        let name = self.characters.get(index).ok_or(ScriptError::InvalidSlot {
            index,
            count: self.characters.len(),
        })?;
        Ok(Self::slot_label(index, name))
    }

    /// One action per slot, relabeled from the slots' current values.
    pub fn dialogue_actions(&self) -> Vec<DialogueAction> {
        self.characters
            .iter()
            .enumerate()
            .map(|(index, name)| DialogueAction {
                index,
                label: format!("Add {} Dialogue", Self::slot_label(index, name)),
            })
            .collect()
    }

    fn push_entry(&mut self, character: String, text: String) -> EntryId {
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        self.dialogues.push(DialogueEntry {
            id,
            character,
            text,
        });
        id
    }

    pub fn add_dialogue_entry(&mut self, character_index: usize) -> ScriptResult<EntryId> {
        let character = self.character_label(character_index)?;
        log::debug!("Adding dialogue entry for '{}'", character);
        Ok(self.push_entry(character, String::new()))
    }

    pub fn set_dialogue_text(&mut self, entry: EntryId, text: impl Into<String>) -> ScriptResult<()> {
        let found = self
            .dialogues
            .iter_mut()
            .find(|e| e.id == entry)
            .ok_or(ScriptError::UnknownEntry(entry.0))?;
        found.text = text.into();
        Ok(())
    }

    /// Returns whether the entry existed.
    pub fn remove_dialogue_entry(&mut self, entry: EntryId) -> bool {
        let before = self.dialogues.len();
        self.dialogues.retain(|e| e.id != entry);
        before != self.dialogues.len()
    }

    /// Rebuilds the field set from a stored script.
    ///
    /// Each dialogue is re-attached to the first slot whose name equals the
    /// stored speaker name; dialogues with no matching slot are dropped.
    pub fn hydrate(script: &Script) -> Self {
        let mut fields = Self::new();
        fields.title = script.title.clone();
        fields.scenario = script.scenario.clone();
        fields.set_character_count(script.characters.len());
        fields.characters.clone_from(&script.characters);

        for dialogue in &script.dialogues {
            let matched = fields
                .characters
                .iter()
                .enumerate()
                .find(|(_, name)| **name == dialogue.character)
                .map(|(index, name)| Self::slot_label(index, name));
            match matched {
                Some(character) => {
                    fields.push_entry(character, dialogue.text.clone());
                }
                None => log::warn!(
                    "Dropping dialogue for '{}' in script {}: no matching character",
                    dialogue.character,
                    script.id
                ),
            }
        }
        fields
    }

    /// Collects the current fields into a validated draft.
    pub fn harvest(&self) -> ScriptResult<ScriptDraft> {
        let title = self.title.trim();
        let scenario = self.scenario.trim();
        if title.is_empty() || scenario.is_empty() {
            return Err(ScriptError::Validation(VALIDATION_MESSAGE.to_string()));
        }

        Ok(ScriptDraft {
            title: title.to_string(),
            scenario: scenario.to_string(),
            characters: self.filled_characters(),
            dialogues: self.filled_dialogues(),
        })
    }

    /// Non-blank slot values, trimmed, in slot order.
    pub fn filled_characters(&self) -> Vec<String> {
        self.characters
            .iter()
            .filter(|name| !is_blank(name))
            .map(|name| name.trim().to_string())
            .collect()
    }

    /// Entries with non-blank text, text trimmed, in list order.
    pub fn filled_dialogues(&self) -> Vec<DialogueLine> {
        self.dialogues
            .iter()
            .filter(|e| !is_blank(&e.text))
            .map(|e| DialogueLine::new(e.character.clone(), e.text.trim()))
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn two_character_fields() -> FieldSet {
        let mut fields = FieldSet::new();
        fields.set_title("My Film");
        fields.set_scenario("Two friends.");
        fields.set_character_count(2);
        fields.set_character_name(0, "Ava").unwrap();
        fields.set_character_name(1, "Ben").unwrap();
        fields
    }

    fn stored(characters: &[&str], dialogues: &[(&str, &str)]) -> Script {
        Script {
            id: "42".to_string(),
            title: "My Film".to_string(),
            scenario: "Two friends.".to_string(),
            characters: characters.iter().map(|c| c.to_string()).collect(),
            dialogues: dialogues
                .iter()
                .map(|(c, t)| DialogueLine::new(*c, *t))
                .collect(),
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn test_rename_does_not_touch_captured_name() {
        let mut fields = two_character_fields();
        let first = fields.add_dialogue_entry(0).unwrap();
        fields.set_character_name(0, "Avery").unwrap();
        let second = fields.add_dialogue_entry(0).unwrap();

        let names: Vec<&str> = fields.dialogues().iter().map(|e| e.character()).collect();
        assert_eq!(names, vec!["Ava", "Avery"]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_count_change_regenerates_slots() {
        let mut fields = two_character_fields();
        fields.set_character_count(1);
        fields.set_character_count(2);
        assert_eq!(fields.characters(), &["".to_string(), "".to_string()]);
    }

    #[test]
    fn test_blank_slot_uses_positional_label() {
        let mut fields = FieldSet::new();
        fields.set_character_count(3);
        fields.set_character_name(0, "Ava").unwrap();
        fields.set_character_name(2, "   ").unwrap();

        let labels: Vec<String> = fields.dialogue_actions().into_iter().map(|a| a.label).collect();
        assert_eq!(
            labels,
            vec!["Add Ava Dialogue", "Add Character 2 Dialogue", "Add Character 3 Dialogue"]
        );

        fields.add_dialogue_entry(1).unwrap();
        assert_eq!(fields.dialogues()[0].character(), "Character 2");
    }

    #[test]
    fn test_out_of_range_references() {
        let mut fields = two_character_fields();
        assert!(matches!(
            fields.add_dialogue_entry(2),
            Err(ScriptError::InvalidSlot { index: 2, count: 2 })
        ));
        assert!(fields.set_character_name(5, "X").is_err());
        assert!(matches!(
            fields.set_dialogue_text(EntryId(99), "x"),
            Err(ScriptError::UnknownEntry(99))
        ));
        assert!(!fields.remove_dialogue_entry(EntryId(99)));
    }

    #[test]
    fn test_remove_keeps_order_of_others() {
        let mut fields = two_character_fields();
        let a = fields.add_dialogue_entry(0).unwrap();
        let b = fields.add_dialogue_entry(1).unwrap();
        let c = fields.add_dialogue_entry(0).unwrap();
        fields.set_dialogue_text(a, "one").unwrap();
        fields.set_dialogue_text(b, "two").unwrap();
        fields.set_dialogue_text(c, "three").unwrap();

        assert!(fields.remove_dialogue_entry(b));
        let texts: Vec<&str> = fields.dialogues().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[test]
    fn test_harvest_filters_and_trims() {
        let mut fields = two_character_fields();
        fields.set_title("  My Film ");
        fields.set_character_count(3);
        fields.set_character_name(0, " Ava ").unwrap();
        fields.set_character_name(2, "Ben").unwrap();
        let a = fields.add_dialogue_entry(0).unwrap();
        let blank = fields.add_dialogue_entry(2).unwrap();
        fields.set_dialogue_text(a, "  Hi\n").unwrap();
        fields.set_dialogue_text(blank, " \n ").unwrap();

        let draft = fields.harvest().unwrap();
        assert_eq!(draft.title, "My Film");
        assert_eq!(draft.characters, vec!["Ava", "Ben"]);
        assert_eq!(draft.dialogues, vec![DialogueLine::new("Ava", "Hi")]);
    }

    #[test]
    fn test_harvest_requires_title_and_scenario() {
        let mut fields = two_character_fields();
        fields.set_title("   ");
        assert!(matches!(fields.harvest(), Err(ScriptError::Validation(_))));

        fields.set_title("My Film");
        fields.set_scenario("");
        assert!(matches!(fields.harvest(), Err(ScriptError::Validation(_))));
    }

    #[test]
    fn test_hydrate_then_harvest_roundtrip() {
        let script = stored(
            &["Ava", "Ben"],
            &[("Ava", "Hi"), ("Ben", "Hey"), ("Ava", "Bye")],
        );
        let fields = FieldSet::hydrate(&script);
        assert_eq!(fields.character_count(), 2);
        assert_eq!(fields.harvest().unwrap(), ScriptDraft::from(&script));
    }

    #[test]
    fn test_hydrate_drops_unmatched_dialogue() {
        let script = stored(&["Ava"], &[("Ava", "Hi"), ("Ben", "Hey")]);
        let fields = FieldSet::hydrate(&script);
        assert_eq!(fields.dialogues().len(), 1);
        assert_eq!(fields.dialogues()[0].text, "Hi");
    }

    #[test]
    fn test_hydrate_matches_first_duplicate() {
        let script = stored(&["Ava", "Ava"], &[("Ava", "Hi")]);
        let fields = FieldSet::hydrate(&script);
        assert_eq!(fields.dialogues()[0].character(), "Ava");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut fields = two_character_fields();
        fields.add_dialogue_entry(0).unwrap();
        fields.reset();
        assert_eq!(fields, FieldSet::new());
    }
}
