use serde::{Deserialize, Serialize};

/// File extension of the markup files the patcher edits.
pub const MARKUP_EXTENSION: &str = ".html";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    File,
    Folder,
}

/// Category of a file. Job descriptions are reference material that stays
/// local: they are never sent to, nor overwritten by, remote services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    #[default]
    Regular,
    JobDescription,
}

/// A file or folder in the in-memory workspace. `path` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualFile {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: FileKind,
    #[serde(default)]
    pub file_type: FileType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VirtualFile>,
    /// Stamp from the owning set's version clock, refreshed on every local
    /// or remote change to this file.
    #[serde(default)]
    pub version: u64,
}

impl VirtualFile {
    pub fn file(path: &str, content: impl Into<String>) -> Self {
        Self {
            name: file_name(path).to_string(),
            path: path.to_string(),
            content: content.into(),
            kind: FileKind::File,
            file_type: FileType::Regular,
            children: Vec::new(),
            version: 1,
        }
    }

    pub fn job_description(path: &str, content: impl Into<String>) -> Self {
        Self {
            file_type: FileType::JobDescription,
            ..Self::file(path, content)
        }
    }

    pub fn folder(path: &str) -> Self {
        Self {
            kind: FileKind::Folder,
            ..Self::file(path, "")
        }
    }

    pub fn is_job_description(&self) -> bool {
        self.file_type == FileType::JobDescription
    }

    /// Eligible for transmission to render, export and AI services.
    pub fn is_renderable(&self) -> bool {
        !self.is_job_description()
    }

    pub fn is_markup(&self) -> bool {
        self.kind == FileKind::File && self.path.ends_with(MARKUP_EXTENSION)
    }

    /// Equality ignoring the version stamp.
    pub fn same_content(&self, other: &VirtualFile) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.content == other.content
            && self.kind == other.kind
            && self.file_type == other.file_type
            && self.children == other.children
    }
}

/// Last path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_remote_shape_with_defaults() {
        let json = r#"{"name": "index.html", "path": "index.html", "content": "<p>x</p>"}"#;
        let file: VirtualFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.kind, FileKind::File);
        assert_eq!(file.file_type, FileType::Regular);
        assert_eq!(file.version, 0);
        assert!(file.is_markup());
    }

    #[test]
    fn test_job_description_wire_name() {
        let file = VirtualFile::job_description("jobs/jd.txt", "Rust engineer");
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["fileType"], "job-description");
        assert_eq!(json["type"], "file");
        assert_eq!(json["name"], "jd.txt");
        assert!(!file.is_renderable());
    }
}
