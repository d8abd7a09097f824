pub mod agent;
pub mod handlers;
pub mod inject;
pub mod recovery;
pub mod render;

use chrono::{DateTime, Utc};

use crate::bridge::{FrameId, Point};
use crate::remote::RenderOutput;

pub use agent::{Directive, EditAgent, Gesture};
pub use render::{RenderOutcome, RenderScheduler, RenderStatus};

/// Attributes the host adds to preview markup start with this prefix and are
/// stripped from anything that flows back into source files.
pub const HOST_ATTR_PREFIX: &str = "data-studio-";

/// Carries each element's locator so the injected agent can name it.
pub const LOCATOR_ATTR: &str = "data-studio-loc";

/// The currently displayed preview frame.
#[derive(Debug, Default)]
pub struct Preview {
    frame: FrameId,
    html: Option<String>,
    agent: Option<EditAgent>,
    origin: Point,
    rendered_at: Option<DateTime<Utc>>,
}

impl Preview {
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn rendered_at(&self) -> Option<DateTime<Utc>> {
        self.rendered_at
    }

    /// Top-left corner of the preview frame on screen.
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    /// True when `frame` is the frame currently on screen.
    pub fn is_live(&self, frame: FrameId) -> bool {
        self.html.is_some() && frame == self.frame
    }

    pub fn agent_mut(&mut self, frame: FrameId) -> Option<&mut EditAgent> {
        if !self.is_live(frame) {
            return None;
        }
        self.agent.as_mut()
    }

    /// Replaces the frame with a freshly rendered document. Any inline edit
    /// in progress in the old frame is abandoned with it.
    pub fn load(&mut self, output: &RenderOutput, events_url: &str) -> FrameId {
        let frame = self.frame.next();
        let built = inject::build_preview(output, frame, events_url);
        if self.agent.as_ref().is_some_and(EditAgent::is_editing) {
            tracing::warn!("Re-render replaced {} while an inline edit was open", self.frame);
        }
        self.frame = frame;
        self.html = Some(built.html);
        self.agent = Some(EditAgent::new(frame, built.document));
        self.rendered_at = Some(Utc::now());
        frame
    }
}
