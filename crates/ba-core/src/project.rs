//! In-memory store for generated project files.

use std::io;
use std::path::{Component, Path};

use ba_protocol::ProjectFile;

/// Ordered collection of generated files, keyed by relative path.
#[derive(Debug, Default)]
pub struct FileStore {
    files: Vec<ProjectFile>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn get(&self, name: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Insert a file, replacing any existing file with the same name.
    pub fn insert(&mut self, file: ProjectFile) {
        match self.files.iter_mut().find(|f| f.name == file.name) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }

    /// Replace the content of an existing file. Returns false when the path
    /// is unknown; a fix for a file that was never generated is not applied.
    pub fn apply_fix(&mut self, path: &str, content: &str) -> bool {
        match self.files.iter_mut().find(|f| f.name == path) {
            Some(file) => {
                file.content = content.to_string();
                true
            }
            None => false,
        }
    }

    /// Write every file under `dir`, creating parent directories.
    pub fn export(&self, dir: &Path) -> io::Result<()> {
        for file in &self.files {
            let rel = Path::new(&file.name);
            if !is_safe_relative(rel) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("refusing to export unsafe path: {}", file.name),
                ));
            }
            let target = dir.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &file.content)?;
        }
        Ok(())
    }
}

/// A path is exportable when it is relative and contains no `..` components.
fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
