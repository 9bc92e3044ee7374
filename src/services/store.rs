use crate::core::error::{ScriptError, ScriptResult};
use crate::core::io::Storage;
use crate::core::state::{Script, ScriptSummary};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub const EMPTY_LIST_MESSAGE: &str = "No saved scripts yet. Create your first script!";

/// Saved scripts, kept in insertion order and written back whole on every change.
pub struct DocumentStore {
    storage: Arc<dyn Storage>,
    key: String,
    scripts: Vec<Script>,
}

impl DocumentStore {
    pub async fn load(storage: Arc<dyn Storage>, key: &str) -> ScriptResult<Self> {
        let scripts = Self::read_collection(storage.as_ref(), key).await?;
        log::info!("Loaded {} saved script(s) from '{}'", scripts.len(), key);
        Ok(Self {
            storage,
            key: key.to_string(),
            scripts,
        })
    }

    async fn read_collection(storage: &dyn Storage, key: &str) -> ScriptResult<Vec<Script>> {
        if !storage.exists(key).await? {
            return Ok(Vec::new());
        }

        let bytes = storage.read(key).await?;
        let content = String::from_utf8(bytes).context("Stored collection is not UTF-8")?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let scripts: Option<Vec<Script>> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse stored collection '{}'", key))?;
        Ok(scripts.unwrap_or_default())
    }

    async fn persist(&self, scripts: &[Script]) -> ScriptResult<()> {
        let content = serde_json::to_string(scripts).context("Failed to serialize scripts")?;
        self.storage
            .write(&self.key, content.as_bytes())
            .await
            .with_context(|| format!("Failed to write collection '{}'", self.key))?;
        Ok(())
    }

    pub fn list(&self) -> &[Script] {
        &self.scripts
    }

    pub fn summaries(&self) -> Vec<ScriptSummary> {
        self.scripts.iter().map(ScriptSummary::from).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Millisecond timestamp id, bumped past any id already in the collection.
    pub fn next_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self.contains(&candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    /// Replaces the script with the same id in place, or appends it.
    pub async fn upsert(&mut self, script: Script) -> ScriptResult<()> {
        let mut next = self.scripts.clone();
        match next.iter().position(|s| s.id == script.id) {
            Some(index) => {
                log::info!("Updating script {} at position {}", script.id, index);
                next[index] = script;
            }
            None => {
                log::info!("Adding script {}", script.id);
                next.push(script);
            }
        }

        self.persist(&next).await?;
        self.scripts = next;
        Ok(())
    }

    /// Returns whether a script was removed. Unknown ids are not an error.
    pub async fn delete(&mut self, id: &str) -> ScriptResult<bool> {
        if !self.contains(id) {
            log::debug!("Delete of unknown script {} ignored", id);
            return Ok(false);
        }

        let next: Vec<Script> = self.scripts.iter().filter(|s| s.id != id).cloned().collect();
        self.persist(&next).await?;
        self.scripts = next;
        log::info!("Deleted script {}", id);
        Ok(true)
    }

    pub fn require(&self, id: &str) -> ScriptResult<&Script> {
        self.get(id)
            .ok_or_else(|| ScriptError::NotFound(format!("script {}", id)))
    }
}
