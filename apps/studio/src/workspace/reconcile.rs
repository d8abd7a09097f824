use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use super::file::VirtualFile;
use super::set::{BaseVersions, FileSet, WorkspaceError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("files changed locally while the request was in flight: {}", .0.join(", "))]
    Conflict(Vec<String>),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

/// Merges a bulk update from a remote service into the live set.
///
/// The result is every incoming file plus every local job-description file.
/// Incoming job-description entries, or incoming files whose path collides
/// with a local job description, are dropped: remote services never see
/// those files and are not allowed to overwrite them. Incoming files equal
/// to the live copy keep the live `Arc` and version; changed and new files
/// are stamped from the live set's version clock.
pub fn merge(current: &FileSet, incoming: Vec<VirtualFile>) -> Result<FileSet, ReconcileError> {
    let job_descriptions: Vec<Arc<VirtualFile>> = current.job_descriptions().cloned().collect();
    let mut merged = Vec::with_capacity(incoming.len() + job_descriptions.len());
    let mut clock = current.clock();

    for mut file in incoming {
        if file.is_job_description() || job_descriptions.iter().any(|jd| jd.path == file.path) {
            warn!("Ignoring remote update to job description '{}'", file.path);
            continue;
        }
        match current.get(&file.path) {
            Some(live) if live.same_content(&file) => merged.push(Arc::clone(live)),
            _ => {
                clock += 1;
                file.version = clock;
                merged.push(Arc::new(file));
            }
        }
    }

    merged.extend(job_descriptions);
    Ok(FileSet::stamped(merged, clock)?)
}

/// [`merge`], refusing to apply when a renderable file was edited, added or
/// deleted locally after `base` was captured.
pub fn merge_checked(
    current: &FileSet,
    incoming: Vec<VirtualFile>,
    base: &BaseVersions,
) -> Result<FileSet, ReconcileError> {
    let conflicts = conflicts(current, base);
    if !conflicts.is_empty() {
        return Err(ReconcileError::Conflict(conflicts));
    }
    merge(current, incoming)
}

/// Paths whose renderable state differs from `base`.
pub fn conflicts(current: &FileSet, base: &BaseVersions) -> Vec<String> {
    let mut paths: Vec<String> = current
        .iter()
        .filter(|f| f.is_renderable())
        .filter(|f| base.get(&f.path) != Some(&f.version))
        .map(|f| f.path.clone())
        .collect();
    paths.extend(
        base.keys()
            .filter(|path| !current.contains(path))
            .cloned(),
    );
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> FileSet {
        FileSet::new([
            VirtualFile::file("index.html", "<p>old</p>"),
            VirtualFile::file("styles.css", "p {}"),
            VirtualFile::job_description("job_description.txt", "Rust engineer"),
        ])
        .unwrap()
    }

    fn wire(path: &str, content: &str) -> VirtualFile {
        VirtualFile {
            version: 0,
            ..VirtualFile::file(path, content)
        }
    }

    #[test]
    fn test_merge_keeps_job_descriptions_and_takes_incoming() {
        let current = live();
        let incoming = vec![
            wire("index.html", "<p>new</p>"),
            wire("styles.css", "p {}"),
        ];
        let merged = merge(&current, incoming).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("index.html").unwrap().content, "<p>new</p>");
        assert_eq!(merged.get("index.html").unwrap().version, 2);
        assert!(Arc::ptr_eq(
            current.get("styles.css").unwrap(),
            merged.get("styles.css").unwrap()
        ));
        assert!(Arc::ptr_eq(
            current.get("job_description.txt").unwrap(),
            merged.get("job_description.txt").unwrap()
        ));
    }

    #[test]
    fn test_merge_drops_incoming_job_description_writes() {
        let current = live();
        let incoming = vec![
            wire("index.html", "<p>old</p>"),
            wire("job_description.txt", "overwritten"),
            VirtualFile::job_description("other_jd.txt", "smuggled"),
        ];
        let merged = merge(&current, incoming).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.get("job_description.txt").unwrap().content,
            "Rust engineer"
        );
        assert!(!merged.contains("other_jd.txt"));
    }

    #[test]
    fn test_files_absent_from_incoming_are_removed() {
        let merged = merge(&live(), vec![wire("index.html", "<p>x</p>")]).unwrap();
        assert!(!merged.contains("styles.css"));
        assert!(merged.contains("job_description.txt"));
    }

    #[test]
    fn test_merge_checked_detects_local_changes() {
        let current = live();
        let base = current.versions();

        let untouched = merge_checked(&current, vec![wire("index.html", "a")], &base);
        assert!(untouched.is_ok());

        let edited = current.with_content("styles.css", "h1 {}".into()).unwrap();
        match merge_checked(&edited, vec![wire("index.html", "a")], &base) {
            Err(ReconcileError::Conflict(paths)) => assert_eq!(paths, vec!["styles.css"]),
            other => panic!("expected conflict, got {other:?}"),
        }

        let deleted = current.without("styles.css").unwrap();
        assert!(matches!(
            merge_checked(&deleted, vec![], &base),
            Err(ReconcileError::Conflict(paths)) if paths == vec!["styles.css".to_string()]
        ));
    }

    #[test]
    fn test_deleted_then_recreated_file_conflicts() {
        let current = live();
        let base = current.versions();
        let recreated = current
            .without("styles.css")
            .unwrap()
            .with_added(VirtualFile::file("styles.css", "body { color: red }"))
            .unwrap();
        assert_eq!(conflicts(&recreated, &base), vec!["styles.css"]);
        assert!(matches!(
            merge_checked(&recreated, vec![wire("index.html", "a")], &base),
            Err(ReconcileError::Conflict(_))
        ));
    }

    #[test]
    fn test_merge_never_lowers_the_clock() {
        let current = live()
            .with_content("styles.css", "h1 {}".into())
            .unwrap();
        let merged = merge(&current, vec![wire("index.html", "<p>x</p>")]).unwrap();
        // styles.css held the highest stamp and is gone now.
        assert_eq!(merged.get("index.html").unwrap().version, 3);
        let readded = merged
            .with_added(VirtualFile::file("styles.css", "h1 {}"))
            .unwrap();
        assert_eq!(readded.get("styles.css").unwrap().version, 4);
    }

    #[test]
    fn test_job_description_edits_never_conflict() {
        let current = live();
        let base = current.versions();
        let edited = current
            .with_content("job_description.txt", "Go engineer".into())
            .unwrap();
        assert!(conflicts(&edited, &base).is_empty());
    }
}
