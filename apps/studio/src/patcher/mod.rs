//! Applies an inline edit from the preview to the authoritative source.
//!
//! The markup file is parsed with the source-preserving parser, the target
//! element is found again from its locator, and only that element's
//! children are replaced. Everything else in the file, and every other
//! file in the set, is left byte-for-byte as it was.

use thiserror::Error;
use tracing::debug;

use crate::bridge::ContentUpdateEvent;
use crate::dom::Document;
use crate::locator::{self, fingerprint, LocateError};
use crate::preview::HOST_ATTR_PREFIX;
use crate::workspace::{FileSet, WorkspaceError};

#[derive(Debug, Error)]
pub enum PatchError {
    #[error(transparent)]
    Target(#[from] WorkspaceError),

    #[error("cannot locate edited element: {0}")]
    Unresolved(#[from] LocateError),

    #[error("element '{locator}' changed since it was rendered")]
    StaleTarget { locator: String },
}

#[derive(Debug)]
pub struct PatchOutcome {
    pub files: FileSet,
    /// Path of the file that was rewritten.
    pub path: String,
}

pub fn patch(
    files: &FileSet,
    main_file: &str,
    update: &ContentUpdateEvent,
) -> Result<PatchOutcome, PatchError> {
    let target_file = files.markup_target(main_file)?;
    let mut doc = Document::parse(&target_file.content);

    let node = match locator::query(&doc, &update.locator) {
        Ok(node) => node,
        Err(err) if !update.id.is_empty() => {
            debug!("Locator '{}' failed ({err}); retrying by id", update.locator);
            doc.elements_with_id(&update.id)
                .next()
                .ok_or(PatchError::Unresolved(err))?
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(expected) = &update.fingerprint {
        if fingerprint(&doc, node) != *expected {
            return Err(PatchError::StaleTarget {
                locator: update.locator.to_string(),
            });
        }
    }

    let mut fragment = Document::parse(&update.html);
    let fragment_root = fragment.root();
    fragment.strip_attrs_with_prefix(fragment_root, HOST_ATTR_PREFIX);
    doc.replace_children(node, &fragment);

    let path = target_file.path.clone();
    let files = files.with_content(&path, doc.to_html())?;
    Ok(PatchOutcome { files, path })
}
