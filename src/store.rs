//! Reminders stored as Markdown checklists in a notes directory.

use std::fs;
use std::path::{Path, PathBuf};

use tasklink_core::checklist;
use tasklink_core::{Error, ItemLocation, ReminderItem, ReminderStore, Result};

/// Every `*.md` file under `root`, addressed by its `/`-separated relative path.
#[derive(Debug, Clone)]
pub struct MarkdownStore {
    root: PathBuf,
}

impl MarkdownStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, document: &str) -> Result<PathBuf> {
        if document.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(Error::io(document, "path escapes the notes directory"));
        }
        Ok(self.root.join(document))
    }

    fn collect_documents(&self, dir: &Path, out: &mut Vec<String>) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| Error::io(&dir.display().to_string(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir.display().to_string(), e))?;
            let path = entry.path();
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if path.is_dir() {
                self.collect_documents(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "md") {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let parts: Vec<_> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    out.push(parts.join("/"));
                }
            }
        }
        Ok(())
    }

    /// Relative names of all Markdown documents, sorted.
    pub fn documents(&self) -> Result<Vec<String>> {
        let mut documents = Vec::new();
        if self.root.exists() {
            self.collect_documents(&self.root, &mut documents)?;
        }
        documents.sort();
        Ok(documents)
    }
}

/// Reminders found in one document's text.
pub fn reminders_in(document: &str, contents: &str) -> Vec<ReminderItem> {
    contents
        .split('\n')
        .enumerate()
        .filter_map(|(index, line)| {
            checklist::parse_line(line.trim_end_matches('\r')).map(|parsed| ReminderItem {
                title: parsed.title,
                due: parsed.due,
                completed: parsed.completed,
                location: ItemLocation::new(document, index),
            })
        })
        .collect()
}

impl ReminderStore for MarkdownStore {
    fn reminders(&self) -> Result<Vec<ReminderItem>> {
        let mut items = Vec::new();
        for document in self.documents()? {
            let contents = self.read_document(&document)?;
            items.extend(reminders_in(&document, &contents));
        }
        tracing::debug!("Found {} reminder(s) in {}", items.len(), self.root.display());
        Ok(items)
    }

    fn read_document(&self, document: &str) -> Result<String> {
        fs::read_to_string(self.path_of(document)?).map_err(|e| Error::io(document, e))
    }

    fn write_document(&self, document: &str, contents: &str) -> Result<()> {
        let path = self.path_of(document)?;
        // Write beside the target, then rename, so an editor never sees half a file
        let staging = path.with_extension("md.tasklink-tmp");
        fs::write(&staging, contents).map_err(|e| Error::io(document, e))?;
        fs::rename(&staging, &path).map_err(|e| Error::io(document, e))
    }

    fn mark_completed(&self, line: &str) -> String {
        checklist::set_completed(line, true)
    }
}
