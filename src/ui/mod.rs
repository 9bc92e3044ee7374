use crate::core::error::ScriptError;
use crate::services::editor::EntryId;
use crate::services::export::ExportedPdf;
use crate::services::session::SessionManager;
use crate::services::store::EMPTY_LIST_MESSAGE;
use anyhow::{Context, Result};
use inquire::{Confirm, CustomType, InquireError, Select, Text};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    SetTitle,
    SetScenario,
    SetCharacterCount,
    EditCharacter,
    AddDialogue,
    EditDialogue,
    RemoveDialogue,
    Save,
    Load,
    Delete,
    Reset,
    ExportCurrent,
    ExportSaved,
    Quit,
}

const MENU: [MenuItem; 14] = [
    MenuItem::SetTitle,
    MenuItem::SetScenario,
    MenuItem::SetCharacterCount,
    MenuItem::EditCharacter,
    MenuItem::AddDialogue,
    MenuItem::EditDialogue,
    MenuItem::RemoveDialogue,
    MenuItem::Save,
    MenuItem::Load,
    MenuItem::Delete,
    MenuItem::Reset,
    MenuItem::ExportCurrent,
    MenuItem::ExportSaved,
    MenuItem::Quit,
];

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuItem::SetTitle => "Set movie name",
            MenuItem::SetScenario => "Set scenario",
            MenuItem::SetCharacterCount => "Set number of characters",
            MenuItem::EditCharacter => "Edit character name",
            MenuItem::AddDialogue => "Add dialogue",
            MenuItem::EditDialogue => "Edit dialogue",
            MenuItem::RemoveDialogue => "Remove dialogue",
            MenuItem::Save => "Save script",
            MenuItem::Load => "View/Edit saved script",
            MenuItem::Delete => "Delete saved script",
            MenuItem::Reset => "Reset form",
            MenuItem::ExportCurrent => "Download PDF",
            MenuItem::ExportSaved => "Download PDF of saved script",
            MenuItem::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// Typed `\n` sequences become line breaks.
fn unescape_breaks(input: &str) -> String {
    input.replace("\\n", "\n")
}

/// Inverse of `unescape_breaks`, for pre-filling a prompt.
fn escape_breaks(input: &str) -> String {
    input.replace('\n', "\\n")
}

pub async fn write_pdf_file(output_folder: &Path, pdf: &ExportedPdf) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_folder)
        .await
        .with_context(|| format!("Failed to create {:?}", output_folder))?;
    let path = output_folder.join(&pdf.file_name);
    tokio::fs::write(&path, &pdf.bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}

fn print_saved_scripts(session: &SessionManager) {
    let scripts = session.saved_scripts();
    println!("\nSaved scripts:");
    if scripts.is_empty() {
        println!("  {}", EMPTY_LIST_MESSAGE);
    }
    for summary in scripts {
        println!("  {}", summary);
    }
}

fn print_preview(session: &SessionManager) {
    println!("\n{}", session.preview());
}

fn choose_saved(session: &SessionManager, prompt: &str) -> Result<Option<String>> {
    let scripts = session.saved_scripts();
    if scripts.is_empty() {
        println!("{}", EMPTY_LIST_MESSAGE);
        return Ok(None);
    }
    let ids: Vec<String> = scripts.iter().map(|s| s.id.clone()).collect();
    let choice = Select::new(prompt, scripts).raw_prompt()?;
    Ok(ids.get(choice.index).cloned())
}

fn choose_character(session: &SessionManager, prompt: &str) -> Result<Option<usize>> {
    let actions = session.dialogue_actions();
    if actions.is_empty() {
        println!("Set the number of characters first.");
        return Ok(None);
    }
    let labels: Vec<String> = actions.iter().map(|a| a.label.clone()).collect();
    let choice = Select::new(prompt, labels).raw_prompt()?;
    Ok(actions.get(choice.index).map(|a| a.index))
}

fn choose_dialogue(session: &SessionManager, prompt: &str) -> Result<Option<EntryId>> {
    let entries = session.fields().dialogues();
    if entries.is_empty() {
        println!("No dialogue entries yet.");
        return Ok(None);
    }
    let labels: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {}: {}", i + 1, e.character(), e.text.replace('\n', " / ")))
        .collect();
    let choice = Select::new(prompt, labels).raw_prompt()?;
    Ok(entries.get(choice.index).map(|e| e.id()))
}

async fn export(session: &SessionManager, saved_id: Option<&str>) -> Result<()> {
    let pdf = match saved_id {
        Some(id) => session.export_saved(id)?,
        None => {
            if !session.preview().export_enabled {
                println!("Nothing to export yet.");
                return Ok(());
            }
            session.export_current()?
        }
    };
    let path = write_pdf_file(Path::new(&session.config().output_folder), &pdf).await?;
    println!("Wrote {} page(s) to {:?}", pdf.page_count, path);
    Ok(())
}

async fn handle(session: &mut SessionManager, item: MenuItem) -> Result<bool> {
    match item {
        MenuItem::SetTitle => {
            let title = Text::new("Movie name:")
                .with_initial_value(&session.fields().title)
                .prompt()?;
            session.set_title(&title);
        }
        MenuItem::SetScenario => {
            let scenario = Text::new("Scenario (\\n for a new line):")
                .with_initial_value(&escape_breaks(&session.fields().scenario))
                .prompt()?;
            session.set_scenario(&unescape_breaks(&scenario));
        }
        MenuItem::SetCharacterCount => {
            let count = CustomType::<usize>::new("Number of characters:")
                .with_error_message("Please enter a whole number")
                .prompt()?;
            session.set_character_count(count);
        }
        MenuItem::EditCharacter => {
            let count = session.fields().character_count();
            if count == 0 {
                println!("Set the number of characters first.");
                return Ok(true);
            }
            let labels: Vec<String> = (1..=count).map(|i| format!("Character {} Name", i)).collect();
            let slot = Select::new("Which character?", labels).raw_prompt()?.index;
            let current = session.fields().characters().get(slot).cloned().unwrap_or_default();
            let name = Text::new("Name:").with_initial_value(&current).prompt()?;
            session.set_character_name(slot, &name)?;
        }
        MenuItem::AddDialogue => {
            if let Some(index) = choose_character(session, "Add dialogue for:")? {
                let entry = session.add_dialogue(index)?;
                let text = Text::new("Dialogue (\\n for a new line):").prompt()?;
                session.set_dialogue_text(entry, &unescape_breaks(&text))?;
            }
        }
        MenuItem::EditDialogue => {
            if let Some(entry) = choose_dialogue(session, "Edit which dialogue?")? {
                let current = session
                    .fields()
                    .dialogues()
                    .iter()
                    .find(|e| e.id() == entry)
                    .map(|e| escape_breaks(&e.text))
                    .unwrap_or_default();
                let text = Text::new("Dialogue (\\n for a new line):")
                    .with_initial_value(&current)
                    .prompt()?;
                session.set_dialogue_text(entry, &unescape_breaks(&text))?;
            }
        }
        MenuItem::RemoveDialogue => {
            if let Some(entry) = choose_dialogue(session, "Remove which dialogue?")? {
                session.remove_dialogue(entry);
            }
        }
        MenuItem::Save => {
            let script = session.save().await?;
            println!("Script saved successfully! ({})", script.title);
            print_saved_scripts(session);
        }
        MenuItem::Load => {
            if let Some(id) = choose_saved(session, "Open which script?")? {
                session.load(&id)?;
            }
        }
        MenuItem::Delete => {
            if let Some(id) = choose_saved(session, "Delete which script?")? {
                let confirmed = session.config().unattended
                    || Confirm::new("Are you sure you want to delete this script?")
                        .with_default(false)
                        .prompt()?;
                if confirmed {
                    session.delete(&id).await?;
                    print_saved_scripts(session);
                }
            }
        }
        MenuItem::Reset => session.reset(),
        MenuItem::ExportCurrent => export(session, None).await?,
        MenuItem::ExportSaved => {
            if let Some(id) = choose_saved(session, "Export which script?")? {
                export(session, Some(&id)).await?;
            }
        }
        MenuItem::Quit => return Ok(false),
    }
    Ok(true)
}

/// Interactive editing loop. Returns when the user quits or interrupts.
pub async fn run(session: &mut SessionManager) -> Result<()> {
    print_saved_scripts(session);
    print_preview(session);

    loop {
        let item = match Select::new("What next?", MENU.to_vec())
            .with_page_size(MENU.len())
            .prompt()
        {
            Ok(item) => item,
            Err(InquireError::OperationCanceled) => continue,
            Err(InquireError::OperationInterrupted) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match handle(session, item).await {
            Ok(true) => print_preview(session),
            Ok(false) => return Ok(()),
            Err(e) => match e.downcast_ref::<InquireError>() {
                Some(InquireError::OperationCanceled) => {}
                Some(InquireError::OperationInterrupted) => return Ok(()),
                _ => {
                    if let Some(ScriptError::Validation(message)) = e.downcast_ref::<ScriptError>() {
                        println!("{}", message);
                    } else {
                        log::error!("{:#}", e);
                        eprintln!("Error: {:#}", e);
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_escaping() {
        assert_eq!(unescape_breaks("one\\ntwo"), "one\ntwo");
        assert_eq!(unescape_breaks("plain"), "plain");
        assert_eq!(escape_breaks("one\ntwo"), "one\\ntwo");
        assert_eq!(unescape_breaks(&escape_breaks("Hi\nthere")), "Hi\nthere");
    }

    #[test]
    fn test_menu_covers_every_item_once() {
        let labels: std::collections::HashSet<String> = MENU.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels.len(), MENU.len());
        assert_eq!(MENU.last(), Some(&MenuItem::Quit));
    }

    #[tokio::test]
    async fn test_write_pdf_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let pdf = ExportedPdf {
            file_name: "my_film_script.pdf".to_string(),
            page_count: 1,
            bytes: b"%PDF-1.4\n".to_vec(),
        };
        let path = write_pdf_file(&temp_dir.path().join("output"), &pdf).await?;
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("my_film_script.pdf"));
        assert_eq!(std::fs::read(path)?, pdf.bytes);
        Ok(())
    }
}
