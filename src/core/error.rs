use thiserror::Error;

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("Layout failure: {0}")]
    Layout(String),

    #[error("No character slot at index {index} (have {count})")]
    InvalidSlot { index: usize, count: usize },

    #[error("Unknown dialogue entry: {0}")]
    UnknownEntry(u64),
}
