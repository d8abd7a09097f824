//! Copy-on-write file collection.
//!
//! Every mutator takes `&self` and returns a new `FileSet`; files that did not
//! change are shared with the previous snapshot through `Arc`, so readers
//! holding an older snapshot never observe a partial update.
//!
//! Versions come from a clock shared by the whole set. Every stamp is larger
//! than any stamp the set has handed out before, including stamps of files
//! that were deleted since, so a path that is deleted and recreated never
//! gets its old version back.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use super::file::{file_name, VirtualFile};

/// Per-path versions of the renderable files, captured when a remote bulk
/// operation is started.
pub type BaseVersions = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("a file already exists at '{0}'")]
    DuplicatePath(String),

    #[error("no file at '{0}'")]
    NotFound(String),

    #[error("invalid file name '{0}'")]
    InvalidName(String),

    #[error("no markup file to patch")]
    NoMarkupFile,

    #[error("several markup files could be patched: {}", .0.join(", "))]
    AmbiguousMarkupFile(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: Vec<Arc<VirtualFile>>,
    /// Highest version stamped so far.
    clock: u64,
}

impl FileSet {
    pub fn new(files: impl IntoIterator<Item = VirtualFile>) -> Result<Self, WorkspaceError> {
        Self::from_shared(files.into_iter().map(Arc::new).collect())
    }

    pub(crate) fn from_shared(files: Vec<Arc<VirtualFile>>) -> Result<Self, WorkspaceError> {
        Self::stamped(files, 0)
    }

    /// Builds a set whose clock is at least `clock`.
    pub(crate) fn stamped(files: Vec<Arc<VirtualFile>>, clock: u64) -> Result<Self, WorkspaceError> {
        let mut seen = HashSet::new();
        for file in &files {
            check_unique(file, &mut seen)?;
        }
        let clock = files.iter().map(|f| f.version).fold(clock, u64::max);
        Ok(Self { files, clock })
    }

    pub(crate) fn clock(&self) -> u64 {
        self.clock
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<VirtualFile>> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Arc<VirtualFile>> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Files that may leave the host.
    pub fn renderable(&self) -> Vec<Arc<VirtualFile>> {
        self.files
            .iter()
            .filter(|f| f.is_renderable())
            .cloned()
            .collect()
    }

    pub fn job_descriptions(&self) -> impl Iterator<Item = &Arc<VirtualFile>> {
        self.files.iter().filter(|f| f.is_job_description())
    }

    pub fn versions(&self) -> BaseVersions {
        self.files
            .iter()
            .filter(|f| f.is_renderable())
            .map(|f| (f.path.clone(), f.version))
            .collect()
    }

    /// Adds a file, stamping it with the next version.
    pub fn with_added(&self, mut file: VirtualFile) -> Result<Self, WorkspaceError> {
        file.version = self.clock + 1;
        let mut files = self.files.clone();
        files.push(Arc::new(file));
        Self::stamped(files, self.clock)
    }

    pub fn without(&self, path: &str) -> Result<Self, WorkspaceError> {
        if !self.contains(path) {
            return Err(WorkspaceError::NotFound(path.to_string()));
        }
        Ok(Self {
            files: self
                .files
                .iter()
                .filter(|f| f.path != path)
                .cloned()
                .collect(),
            clock: self.clock,
        })
    }

    /// Replaces one file's content and stamps it with the next version.
    pub fn with_content(&self, path: &str, content: String) -> Result<Self, WorkspaceError> {
        self.map_one(path, |file, version| VirtualFile {
            content,
            version,
            ..file.clone()
        })
    }

    pub fn renamed(&self, path: &str, new_path: &str) -> Result<Self, WorkspaceError> {
        if new_path != path && self.contains(new_path) {
            return Err(WorkspaceError::DuplicatePath(new_path.to_string()));
        }
        self.map_one(path, |file, version| VirtualFile {
            name: file_name(new_path).to_string(),
            path: new_path.to_string(),
            version,
            ..file.clone()
        })
    }

    fn map_one(
        &self,
        path: &str,
        update: impl FnOnce(&VirtualFile, u64) -> VirtualFile,
    ) -> Result<Self, WorkspaceError> {
        let index = self
            .files
            .iter()
            .position(|f| f.path == path)
            .ok_or_else(|| WorkspaceError::NotFound(path.to_string()))?;
        let clock = self.clock + 1;
        let mut files = self.files.clone();
        files[index] = Arc::new(update(&self.files[index], clock));
        Ok(Self { files, clock })
    }

    /// The markup file direct edits are applied to: the designated main file
    /// when it is a markup file in the set, otherwise the only renderable
    /// markup file. Zero or several candidates is an error, never a guess.
    pub fn markup_target(&self, main_file: &str) -> Result<&Arc<VirtualFile>, WorkspaceError> {
        if let Some(main) = self
            .get(main_file)
            .filter(|f| f.is_markup() && f.is_renderable())
        {
            return Ok(main);
        }
        let candidates: Vec<&Arc<VirtualFile>> = self
            .files
            .iter()
            .filter(|f| f.is_markup() && f.is_renderable())
            .collect();
        match candidates.as_slice() {
            [] => Err(WorkspaceError::NoMarkupFile),
            [only] => Ok(only),
            many => Err(WorkspaceError::AmbiguousMarkupFile(
                many.iter().map(|f| f.path.clone()).collect(),
            )),
        }
    }
}

fn check_unique<'a>(
    file: &'a VirtualFile,
    seen: &mut HashSet<&'a str>,
) -> Result<(), WorkspaceError> {
    if !seen.insert(file.path.as_str()) {
        return Err(WorkspaceError::DuplicatePath(file.path.clone()));
    }
    for child in &file.children {
        check_unique(child, seen)?;
    }
    Ok(())
}
