//! Directory-browsing state for the load action's file chooser modal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug)]
pub struct FilePicker {
    pub dir: PathBuf,
    pub entries: Vec<PickerEntry>,
    pub selected: usize,
    pub scroll: usize,
}

impl FilePicker {
    /// Open the chooser in the current directory, falling back to the home
    /// directory when the cwd is unavailable.
    pub fn open() -> Result<Self> {
        let dir = std::env::current_dir()
            .ok()
            .or_else(dirs::home_dir)
            .context("could not determine a starting directory")?;
        let mut picker = Self {
            dir,
            entries: Vec::new(),
            selected: 0,
            scroll: 0,
        };
        picker.reload()?;
        Ok(picker)
    }

    /// List the current directory: subdirectories plus .csv files, each
    /// kind sorted by name. Hidden entries are skipped.
    fn reload(&mut self) -> Result<()> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let listing = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?;
        for entry in listing.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                dirs.push(PickerEntry { name, is_dir: true });
            } else if name.to_lowercase().ends_with(".csv") {
                files.push(PickerEntry { name, is_dir: false });
            }
        }
        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));
        self.entries = dirs;
        self.entries.extend(files);
        self.selected = 0;
        self.scroll = 0;
        Ok(())
    }

    pub fn selected_entry(&self) -> Option<&PickerEntry> {
        self.entries.get(self.selected)
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + 1).min(self.entries.len() - 1);
        }
    }

    /// Enter on the selected entry: descend into a directory (returns
    /// `None`) or yield the chosen file path.
    pub fn enter(&mut self) -> Result<Option<PathBuf>> {
        let Some(entry) = self.selected_entry().cloned() else {
            return Ok(None);
        };
        if entry.is_dir {
            self.dir.push(&entry.name);
            if let Err(err) = self.reload() {
                self.dir.pop();
                self.reload()?;
                return Err(err);
            }
            Ok(None)
        } else {
            Ok(Some(self.dir.join(&entry.name)))
        }
    }

    /// Step up to the parent directory, if any.
    pub fn ascend(&mut self) -> Result<()> {
        if self.dir.parent().is_some() {
            self.dir.pop();
            self.reload()?;
        }
        Ok(())
    }

    pub fn dir_display(&self) -> String {
        display_path(&self.dir)
    }
}

/// Abbreviate a path under $HOME with a leading "~".
fn display_path(path: &Path) -> String {
    let raw = path.display().to_string();
    if let Some(home) = dirs::home_dir() {
        let home = home.display().to_string();
        if !home.is_empty() && raw.starts_with(&home) {
            return format!("~{}", &raw[home.len()..]);
        }
    }
    raw
}
