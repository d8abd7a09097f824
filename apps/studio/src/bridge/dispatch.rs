use chrono::Utc;
use tracing::{debug, info, warn};

use super::{BridgeMessage, Envelope};
use crate::assist::AiEditPrompt;
use crate::patcher;
use crate::session::EditorSession;

/// What the host did with one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    PromptOpened,
    /// A source file was rewritten and the preview needs a render.
    Patched { path: String },
    /// Not meant for the current preview.
    Ignored(String),
    /// The edit could not be applied to the source.
    Dropped(String),
}

impl Dispatch {
    pub fn needs_render(&self) -> bool {
        matches!(self, Dispatch::Patched { .. })
    }
}

pub fn dispatch(session: &mut EditorSession, envelope: Envelope) -> Dispatch {
    if !session.preview.is_live(envelope.frame) {
        let reason = format!(
            "{} from {} while {} is displayed",
            envelope.message.kind(),
            envelope.frame,
            session.preview.frame()
        );
        debug!("Ignoring stale message: {reason}");
        return Dispatch::Ignored(reason);
    }

    match envelope.message {
        BridgeMessage::ElementSelected(element) => {
            let position = session.preview.origin() + element.position;
            info!("Element <{}> selected; AI prompt opened", element.tag_name);
            session.prompt = Some(AiEditPrompt {
                element,
                position,
                target_path: session.workspace.current_path().map(str::to_string),
                frame: envelope.frame,
                opened_at: Utc::now(),
            });
            Dispatch::PromptOpened
        }
        BridgeMessage::ContentUpdated(update) => {
            let files = session.workspace.files();
            match patcher::patch(files, session.workspace.main_file(), &update) {
                Ok(outcome) => {
                    info!("Patched '{}' at {}", outcome.path, update.locator);
                    session.workspace.replace_files(outcome.files);
                    Dispatch::Patched { path: outcome.path }
                }
                Err(err) => {
                    warn!("Dropped inline edit of {}: {err}", update.locator);
                    Dispatch::Dropped(err.to_string())
                }
            }
        }
    }
}
