use crate::core::config::Config;
use crate::core::error::ScriptResult;
use crate::core::state::{Script, ScriptSummary};
use crate::services::editor::{DialogueAction, EntryId, FieldSet};
use crate::services::export::{self, ExportedPdf, ScriptContent, TextLayout};
use crate::services::preview::{self, Preview};
use crate::services::store::DocumentStore;
use chrono::Utc;

/// One editing session over the document store.
///
/// Every mutation of the field set re-renders the preview before returning,
/// so `preview()` always reflects the current fields.
pub struct SessionManager {
    config: Config,
    store: DocumentStore,
    fields: FieldSet,
    current_id: Option<String>,
    preview: Preview,
    layout: Box<dyn TextLayout>,
}

impl SessionManager {
    pub fn new(config: Config, store: DocumentStore, layout: Box<dyn TextLayout>) -> Self {
        Self {
            config,
            store,
            fields: FieldSet::new(),
            current_id: None,
            preview: Preview::default(),
            layout,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn saved_scripts(&self) -> Vec<ScriptSummary> {
        self.store.summaries()
    }

    pub fn dialogue_actions(&self) -> Vec<DialogueAction> {
        self.fields.dialogue_actions()
    }

    fn refresh(&mut self) {
        self.preview = preview::render(&self.fields);
    }

    pub fn set_title(&mut self, title: &str) {
        self.fields.set_title(title);
        self.refresh();
    }

    pub fn set_scenario(&mut self, scenario: &str) {
        self.fields.set_scenario(scenario);
        self.refresh();
    }

    pub fn set_character_count(&mut self, count: usize) {
        self.fields.set_character_count(count);
        self.refresh();
    }

    pub fn set_character_name(&mut self, index: usize, name: &str) -> ScriptResult<()> {
        let result = self.fields.set_character_name(index, name);
        self.refresh();
        result
    }

    pub fn add_dialogue(&mut self, character_index: usize) -> ScriptResult<EntryId> {
        let result = self.fields.add_dialogue_entry(character_index);
        self.refresh();
        result
    }

    pub fn set_dialogue_text(&mut self, entry: EntryId, text: &str) -> ScriptResult<()> {
        let result = self.fields.set_dialogue_text(entry, text);
        self.refresh();
        result
    }

    pub fn remove_dialogue(&mut self, entry: EntryId) -> bool {
        let removed = self.fields.remove_dialogue_entry(entry);
        self.refresh();
        removed
    }

    pub fn reset(&mut self) {
        self.fields.reset();
        self.current_id = None;
        self.refresh();
    }

    /// Validates, writes the script and clears the session.
    ///
    /// On any failure the store and the session are left as they were.
    pub async fn save(&mut self) -> ScriptResult<Script> {
        let draft = self.fields.harvest()?;
        let id = match &self.current_id {
            Some(id) => id.clone(),
            None => self.store.next_id(),
        };
        let script = draft.into_script(id, Utc::now());

        self.store.upsert(script.clone()).await?;
        log::info!("Saved script '{}' ({})", script.title, script.id);
        self.reset();
        Ok(script)
    }

    pub fn load(&mut self, id: &str) -> ScriptResult<()> {
        let script = self.store.require(id)?;
        let fields = FieldSet::hydrate(script);
        log::info!("Loaded script '{}' ({}) for editing", script.title, id);

        self.fields = fields;
        self.current_id = Some(id.to_string());
        self.refresh();
        Ok(())
    }

    /// Removes a stored script; resets the session if it was the one loaded.
    pub async fn delete(&mut self, id: &str) -> ScriptResult<bool> {
        let removed = self.store.delete(id).await?;
        if self.current_id.as_deref() == Some(id) {
            log::info!("Deleted the script being edited, resetting session");
            self.reset();
        }
        Ok(removed)
    }

    pub fn export_current(&self) -> ScriptResult<ExportedPdf> {
        let content = ScriptContent::from_fields(&self.fields);
        export::export(&content, &self.config.export, self.layout.as_ref())
    }

    pub fn export_saved(&self, id: &str) -> ScriptResult<ExportedPdf> {
        let content = ScriptContent::from_script(self.store.require(id)?);
        export::export(&content, &self.config.export, self.layout.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ScriptError;
    use crate::core::io::{MemoryStorage, Storage};
    use crate::core::state::DialogueLine;
    use crate::services::preview::PreviewBlock;
    use crate::utils::pdf::HelveticaLayout;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Memory storage whose writes start failing once `should_fail` is set.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        should_fail: AtomicBool,
    }

    #[async_trait]
    impl Storage for FlakyStorage {
        async fn read(&self, key: &str) -> Result<Vec<u8>> {
            self.inner.read(key).await
        }
        async fn write(&self, key: &str, content: &[u8]) -> Result<()> {
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("disk full"));
            }
            self.inner.write(key, content).await
        }
        async fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key).await
        }
    }

    async fn manager_with(storage: Arc<dyn Storage>) -> Result<SessionManager> {
        let config = Config::default();
        let store = DocumentStore::load(storage, &config.storage_key).await?;
        Ok(SessionManager::new(config, store, Box::new(HelveticaLayout)))
    }

    async fn manager() -> Result<SessionManager> {
        manager_with(Arc::new(MemoryStorage::new())).await
    }

    async fn save_my_film(session: &mut SessionManager) -> Result<Script> {
        session.set_title("My Film");
        session.set_scenario("Two friends.");
        session.set_character_count(2);
        session.set_character_name(0, "Ava")?;
        session.set_character_name(1, "Ben")?;
        let a = session.add_dialogue(0)?;
        session.set_dialogue_text(a, "Hi")?;
        let b = session.add_dialogue(1)?;
        session.set_dialogue_text(b, "Hey")?;
        Ok(session.save().await?)
    }

    #[tokio::test]
    async fn test_save_reload_export_end_to_end() -> Result<()> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut session = manager_with(storage.clone()).await?;
        let saved = save_my_film(&mut session).await?;

        assert!(!saved.id.is_empty());
        assert_eq!(saved.title, "My Film");
        assert_eq!(saved.characters, vec!["Ava", "Ben"]);
        assert_eq!(
            saved.dialogues,
            vec![DialogueLine::new("Ava", "Hi"), DialogueLine::new("Ben", "Hey")]
        );

        // session was reset after the save
        assert_eq!(session.fields(), &FieldSet::new());
        assert!(session.current_id().is_none());
        assert!(!session.preview().export_enabled);

        // a fresh session sees exactly one stored script
        let mut session = manager_with(storage).await?;
        assert_eq!(session.saved_scripts().len(), 1);

        session.load(&saved.id)?;
        assert_eq!(session.current_id(), Some(saved.id.as_str()));
        assert_eq!(session.fields().characters(), &["Ava".to_string(), "Ben".to_string()]);
        let lines: Vec<(&str, &str)> = session
            .fields()
            .dialogues()
            .iter()
            .map(|e| (e.character(), e.text.as_str()))
            .collect();
        assert_eq!(lines, vec![("Ava", "Hi"), ("Ben", "Hey")]);

        let pdf = session.export_current()?;
        assert_eq!(pdf.file_name, "my_film_script.pdf");
        assert_eq!(session.export_saved(&saved.id)?.file_name, "my_film_script.pdf");
        Ok(())
    }

    #[tokio::test]
    async fn test_resave_keeps_id_and_position() -> Result<()> {
        let mut session = manager().await?;
        let first = save_my_film(&mut session).await?;
        let second = save_my_film(&mut session).await?;
        assert_ne!(first.id, second.id);

        session.load(&first.id)?;
        session.set_title("My Film, Redux");
        let updated = session.save().await?;
        assert_eq!(updated.id, first.id);

        let titles: Vec<String> = session.saved_scripts().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["My Film, Redux", "My Film"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_save_changes_nothing() -> Result<()> {
        let mut session = manager().await?;
        session.set_title("My Film");
        session.set_character_count(1);
        session.set_character_name(0, "Ava")?;

        let result = session.save().await;
        assert!(matches!(result, Err(ScriptError::Validation(_))));
        assert!(session.saved_scripts().is_empty());
        assert_eq!(session.fields().title, "My Film");
        assert_eq!(session.fields().characters(), &["Ava".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_session() -> Result<()> {
        let storage = Arc::new(FlakyStorage::default());
        let mut session = manager_with(storage.clone()).await?;
        let saved = save_my_film(&mut session).await?;

        session.load(&saved.id)?;
        session.set_title("My Film, Redux");
        let before = session.fields().clone();
        storage.should_fail.store(true, Ordering::SeqCst);

        let result = session.save().await;
        assert!(matches!(result, Err(ScriptError::Storage(_))));
        assert_eq!(session.fields(), &before);
        assert_eq!(session.current_id(), Some(saved.id.as_str()));
        assert!(session.preview().export_enabled);
        assert_eq!(session.saved_scripts()[0].title, "My Film");

        let result = session.delete(&saved.id).await;
        assert!(matches!(result, Err(ScriptError::Storage(_))));
        assert_eq!(session.fields(), &before);
        assert_eq!(session.current_id(), Some(saved.id.as_str()));
        assert_eq!(session.saved_scripts().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_other_keeps_session() -> Result<()> {
        let mut session = manager().await?;
        let other = save_my_film(&mut session).await?;
        let mine = save_my_film(&mut session).await?;

        session.load(&mine.id)?;
        assert!(session.delete(&other.id).await?);
        assert_eq!(session.current_id(), Some(mine.id.as_str()));
        assert_eq!(session.fields().title, "My Film");

        assert!(!session.delete("does-not-exist").await?);
        assert_eq!(session.current_id(), Some(mine.id.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_current_resets_session() -> Result<()> {
        let mut session = manager().await?;
        let saved = save_my_film(&mut session).await?;

        session.load(&saved.id)?;
        assert!(session.delete(&saved.id).await?);
        assert!(session.current_id().is_none());
        assert_eq!(session.fields(), &FieldSet::new());
        assert!(session.saved_scripts().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() -> Result<()> {
        let mut session = manager().await?;
        session.set_title("Draft");
        assert!(matches!(session.load("nope"), Err(ScriptError::NotFound(_))));
        assert!(matches!(session.export_saved("nope"), Err(ScriptError::NotFound(_))));
        assert_eq!(session.fields().title, "Draft");
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_follows_every_edit() -> Result<()> {
        let mut session = manager().await?;
        assert!(!session.preview().export_enabled);

        session.set_title("My Film");
        assert_eq!(session.preview().blocks[0], PreviewBlock::Title("My Film".to_string()));

        session.set_character_count(1);
        session.set_character_name(0, "Ava")?;
        assert!(session.preview().blocks.contains(&PreviewBlock::ListItem("Ava".to_string())));

        let entry = session.add_dialogue(0)?;
        session.set_dialogue_text(entry, "Hi")?;
        assert!(session.preview().blocks.iter().any(|b| matches!(b, PreviewBlock::Dialogue { .. })));

        assert!(session.remove_dialogue(entry));
        assert!(!session.preview().blocks.iter().any(|b| matches!(b, PreviewBlock::Dialogue { .. })));

        session.reset();
        assert!(!session.preview().export_enabled);
        Ok(())
    }
}
