pub mod file;
pub mod handlers;
pub mod reconcile;
pub mod set;
pub mod templates;

use std::sync::Arc;

use serde::Deserialize;

pub use file::{FileKind, FileType, VirtualFile};
pub use reconcile::ReconcileError;
pub use set::{BaseVersions, FileSet, WorkspaceError};

/// What the file explorer asked to create.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NewFile {
    /// A file named `untitled_<n>` with the extension of the current file's
    /// type (`.css` when a stylesheet is open, `.html` otherwise).
    File {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Folder {
        #[serde(default)]
        name: Option<String>,
    },
    JobDescription { name: String, content: String },
}

/// The live file tree plus the editor's current-file pointer.
#[derive(Debug, Clone)]
pub struct Workspace {
    files: FileSet,
    current: Option<String>,
    main_file: String,
}

impl Workspace {
    pub fn new(files: FileSet, main_file: impl Into<String>) -> Self {
        let main_file = main_file.into();
        let current = files
            .get(&main_file)
            .or_else(|| files.iter().next())
            .map(|f| f.path.clone());
        Self {
            files,
            current,
            main_file,
        }
    }

    /// A workspace holding the sample resume and its stylesheet.
    pub fn seeded(main_file: impl Into<String>) -> Result<Self, WorkspaceError> {
        let files = FileSet::new([
            VirtualFile::file("index.html", templates::SAMPLE_INDEX_HTML),
            VirtualFile::file("styles.css", templates::SAMPLE_STYLES_CSS),
        ])?;
        Ok(Self::new(files, main_file))
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn main_file(&self) -> &str {
        &self.main_file
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Arc<VirtualFile>> {
        self.current.as_deref().and_then(|path| self.files.get(path))
    }

    pub fn select(&mut self, path: &str) -> Result<(), WorkspaceError> {
        if !self.files.contains(path) {
            return Err(WorkspaceError::NotFound(path.to_string()));
        }
        self.current = Some(path.to_string());
        Ok(())
    }

    pub fn create(&mut self, request: NewFile) -> Result<Arc<VirtualFile>, WorkspaceError> {
        let (file, make_current) = match request {
            NewFile::File { name, content } => {
                let stylesheet = self
                    .current_path()
                    .is_some_and(|path| path.ends_with(".css"));
                let (extension, template) = if stylesheet {
                    (".css", templates::NEW_CSS_FILE)
                } else {
                    (".html", templates::NEW_HTML_FILE)
                };
                let path = match name {
                    Some(name) => validate_name(&name)?,
                    None => self.untitled_name(extension),
                };
                let content = content.unwrap_or_else(|| template.to_string());
                (VirtualFile::file(&path, content), true)
            }
            NewFile::Folder { name } => {
                let path = match name {
                    Some(name) => validate_name(&name)?,
                    None => "new_folder".to_string(),
                };
                (VirtualFile::folder(&path), false)
            }
            NewFile::JobDescription { name, content } => {
                let path = validate_name(&name)?;
                (VirtualFile::job_description(&path, content), false)
            }
        };

        let path = file.path.clone();
        self.files = self.files.with_added(file)?;
        if make_current {
            self.current = Some(path.clone());
        }
        self.files
            .get(&path)
            .cloned()
            .ok_or(WorkspaceError::NotFound(path))
    }

    /// Removes a file; when it was current, the first remaining file
    /// becomes current.
    pub fn delete(&mut self, path: &str) -> Result<(), WorkspaceError> {
        self.files = self.files.without(path)?;
        if self.current.as_deref() == Some(path) {
            self.current = self.files.iter().next().map(|f| f.path.clone());
        }
        Ok(())
    }

    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<(), WorkspaceError> {
        let new_path = validate_name(new_name)?;
        self.files = self.files.renamed(path, &new_path)?;
        if self.current.as_deref() == Some(path) {
            self.current = Some(new_path);
        }
        Ok(())
    }

    pub fn edit(&mut self, path: &str, content: String) -> Result<(), WorkspaceError> {
        self.files = self.files.with_content(path, content)?;
        Ok(())
    }

    /// Installs a new snapshot and reattaches the current pointer by path.
    /// A current path missing from the new set leaves no file selected.
    pub fn replace_files(&mut self, files: FileSet) {
        self.files = files;
        if let Some(path) = &self.current {
            if !self.files.contains(path) {
                tracing::debug!("Current file '{path}' left the workspace");
                self.current = None;
            }
        }
    }

    /// Reconciles a remote bulk update. With `base`, a file changed locally
    /// after the request was sent is reported as a conflict.
    pub fn apply_bulk_update(
        &mut self,
        incoming: Vec<VirtualFile>,
        base: Option<&BaseVersions>,
    ) -> Result<(), ReconcileError> {
        let merged = match base {
            Some(base) => reconcile::merge_checked(&self.files, incoming, base)?,
            None => reconcile::merge(&self.files, incoming)?,
        };
        self.replace_files(merged);
        Ok(())
    }

    fn untitled_name(&self, extension: &str) -> String {
        let mut n = self.files.len();
        loop {
            let candidate = format!("untitled_{n}{extension}");
            if !self.files.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn validate_name(name: &str) -> Result<String, WorkspaceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.starts_with('/') || trimmed.ends_with('/') {
        return Err(WorkspaceError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::seeded("index.html").unwrap()
    }

    #[test]
    fn test_seeded_workspace_selects_main_file() {
        let ws = workspace();
        assert_eq!(ws.current_path(), Some("index.html"));
        assert_eq!(ws.files().len(), 2);
    }

    #[test]
    fn test_create_file_uses_current_extension_and_becomes_current() {
        let mut ws = workspace();
        let created = ws
            .create(NewFile::File {
                name: None,
                content: None,
            })
            .unwrap();
        assert_eq!(created.path, "untitled_2.html");
        assert!(created.content.contains("New Page"));
        assert_eq!(ws.current_path(), Some("untitled_2.html"));

        ws.select("styles.css").unwrap();
        let css = ws
            .create(NewFile::File {
                name: None,
                content: None,
            })
            .unwrap();
        assert_eq!(css.path, "untitled_3.css");
    }

    #[test]
    fn test_untitled_name_skips_taken_paths() {
        let mut ws = workspace();
        ws.create(NewFile::File {
            name: Some("untitled_2.html".into()),
            content: None,
        })
        .unwrap();
        ws.delete("styles.css").unwrap();
        let next = ws
            .create(NewFile::File {
                name: None,
                content: None,
            })
            .unwrap();
        assert_eq!(next.path, "untitled_3.html");
    }

    #[test]
    fn test_folder_and_job_description_do_not_steal_focus() {
        let mut ws = workspace();
        ws.create(NewFile::Folder { name: None }).unwrap();
        let jd = ws
            .create(NewFile::JobDescription {
                name: "job_description.txt".into(),
                content: "Senior Rust engineer".into(),
            })
            .unwrap();
        assert!(jd.is_job_description());
        assert_eq!(ws.files().get("new_folder").unwrap().kind, FileKind::Folder);
        assert_eq!(ws.current_path(), Some("index.html"));
    }

    #[test]
    fn test_delete_current_falls_back_to_first_file() {
        let mut ws = workspace();
        ws.delete("index.html").unwrap();
        assert_eq!(ws.current_path(), Some("styles.css"));
        assert_eq!(
            ws.delete("index.html").unwrap_err(),
            WorkspaceError::NotFound("index.html".into())
        );
    }

    #[test]
    fn test_rename_moves_current_pointer() {
        let mut ws = workspace();
        ws.rename("index.html", "  resume.html ").unwrap();
        assert_eq!(ws.current_path(), Some("resume.html"));
        assert_eq!(ws.current().unwrap().name, "resume.html");
        assert!(matches!(
            ws.rename("resume.html", "   "),
            Err(WorkspaceError::InvalidName(_))
        ));
    }

    #[test]
    fn test_bulk_update_drops_pointer_to_vanished_file() {
        let mut ws = workspace();
        ws.select("styles.css").unwrap();
        ws.apply_bulk_update(vec![VirtualFile::file("index.html", "<p>x</p>")], None)
            .unwrap();
        assert_eq!(ws.current_path(), None);
        assert!(ws.current().is_none());
    }
}
