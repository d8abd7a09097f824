//! Debounced, generation-ordered preview rendering.
//!
//! Content edits call [`RenderScheduler::schedule`], which restarts a fixed
//! delay; only the last of a burst of edits reaches the render service.
//! File switches and bulk updates call [`RenderScheduler::render_now`].
//! Every request takes a generation number when it starts, and a response
//! older than the last one applied is discarded, so a slow response can
//! never roll the preview back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::FrameId;
use crate::remote::Renderer;
use crate::session::SharedSession;

#[derive(Debug, Clone, Default)]
pub struct RenderStatus {
    /// Requests sent and not yet answered.
    pub in_flight: usize,
    pub last_error: Option<String>,
    /// Generation of the last response applied, successful or not.
    pub applied_generation: u64,
}

impl RenderStatus {
    pub fn is_rendering(&self) -> bool {
        self.in_flight > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Applied(FrameId),
    Failed(String),
    /// A newer render finished first.
    Superseded,
}

#[derive(Clone)]
pub struct RenderScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    session: SharedSession,
    renderer: Arc<dyn Renderer>,
    delay: Duration,
    events_url: String,
    pending: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
}

impl RenderScheduler {
    pub fn new(
        session: SharedSession,
        renderer: Arc<dyn Renderer>,
        delay: Duration,
        events_url: String,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                session,
                renderer,
                delay,
                events_url,
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Renders once the delay has passed without another call.
    pub fn schedule(&self) {
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        let scheduler = self.clone();
        let delay = self.inner.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The request runs in its own task: aborting this timer later
            // must not cancel a render that is already on the wire.
            tokio::spawn(async move {
                scheduler.run().await;
            });
        }));
    }

    /// Cancels a debounced render that has not started. Returns whether one
    /// was pending.
    pub fn cancel_pending(&self) -> bool {
        let timer = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match timer {
            Some(timer) if !timer.is_finished() => {
                timer.abort();
                true
            }
            _ => false,
        }
    }

    /// Renders immediately, superseding any pending debounced render.
    pub async fn render_now(&self) -> RenderOutcome {
        if self.cancel_pending() {
            debug!("Debounced render replaced by an immediate one");
        }
        self.run().await
    }

    /// [`render_now`](Self::render_now) in the background.
    pub fn spawn_render(&self) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.render_now().await;
        });
    }

    async fn run(&self) -> RenderOutcome {
        let (generation, files, main_file) = {
            let mut session = self.inner.session.lock().await;
            // Numbered under the lock so a later number always means a newer snapshot.
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            session.render.in_flight += 1;
            (
                generation,
                session.workspace.files().renderable(),
                session.workspace.main_file().to_string(),
            )
        };
        info!("Render #{generation} started ({} file(s), main {main_file})", files.len());

        let result = self.inner.renderer.render(&files, &main_file).await;

        let mut session = self.inner.session.lock().await;
        session.render.in_flight = session.render.in_flight.saturating_sub(1);
        if generation < session.render.applied_generation {
            debug!(
                "Discarding render #{generation}; #{} was already applied",
                session.render.applied_generation
            );
            return RenderOutcome::Superseded;
        }
        session.render.applied_generation = generation;

        match result {
            Ok(output) => {
                let frame = session.preview.load(&output, &self.inner.events_url);
                session.render.last_error = None;
                info!("Render #{generation} applied as {frame}");
                RenderOutcome::Applied(frame)
            }
            Err(err) => {
                warn!("Render #{generation} failed: {err}");
                let message = format!("Failed to render preview: {err}");
                session.render.last_error = Some(message.clone());
                RenderOutcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Mutex as AsyncMutex;

    use super::*;
    use crate::session::EditorSession;
    use crate::testing::StubRenderer;
    use crate::workspace::Workspace;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    fn setup() -> (RenderScheduler, Arc<StubRenderer>, SharedSession) {
        let session: SharedSession = Arc::new(AsyncMutex::new(EditorSession::new(
            Workspace::seeded("index.html").unwrap(),
        )));
        let renderer = StubRenderer::new();
        let scheduler = RenderScheduler::new(
            Arc::clone(&session),
            renderer.clone(),
            DEBOUNCE,
            "http://localhost:8080/api/v1/preview/events".into(),
        );
        (scheduler, renderer, session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_window_renders_once() {
        let (scheduler, renderer, _session) = setup();
        for _ in 0..5 {
            scheduler.schedule();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(renderer.calls(), 0);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_edits_render_each_time() {
        let (scheduler, renderer, _session) = setup();
        for expected in 1..=3 {
            scheduler.schedule();
            tokio::time::sleep(DEBOUNCE + Duration::from_millis(200)).await;
            assert_eq!(renderer.calls(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_now_bypasses_and_cancels_debounce() {
        let (scheduler, renderer, session) = setup();
        scheduler.schedule();
        let outcome = scheduler.render_now().await;
        assert_eq!(outcome, RenderOutcome::Applied(FrameId(1)));
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(renderer.calls(), 1);
        let session = session.lock().await;
        assert!(session.preview.html().unwrap().contains("Your Name"));
        assert!(!session.render.is_rendering());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_does_not_roll_back_preview() {
        let (scheduler, renderer, session) = setup();
        renderer.push_delay(Duration::from_millis(500));
        renderer.push_delay(Duration::from_millis(100));

        let slow = scheduler.render_now();
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            scheduler.render_now().await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow, RenderOutcome::Superseded);
        assert_eq!(fast, RenderOutcome::Applied(FrameId(1)));
        let session = session.lock().await;
        assert!(session.preview.html().unwrap().contains("<!-- render 2 -->"));
        assert_eq!(session.render.applied_generation, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newest_snapshot_wins_over_slower_older_render() {
        let (scheduler, renderer, session) = setup();
        renderer.push_delay(Duration::from_millis(500));
        renderer.push_delay(Duration::from_millis(100));

        let old = scheduler.render_now();
        let new = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session
                .lock()
                .await
                .workspace
                .edit("index.html", "<html><body><h1>Edited</h1></body></html>".into())
                .unwrap();
            scheduler.render_now().await
        };
        let (old, new) = tokio::join!(old, new);

        assert_eq!(old, RenderOutcome::Superseded);
        assert_eq!(new, RenderOutcome::Applied(FrameId(1)));
        let session = session.lock().await;
        let html = session.preview.html().unwrap();
        assert!(html.contains(">Edited</h1>"));
        assert!(!html.contains("Your Name"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_good_preview() {
        let (scheduler, renderer, session) = setup();
        scheduler.render_now().await;
        renderer.set_failing(true);
        let outcome = scheduler.render_now().await;
        assert!(matches!(outcome, RenderOutcome::Failed(msg) if msg.starts_with("Failed to render preview")));

        let session = session.lock().await;
        assert_eq!(session.preview.frame(), FrameId(1));
        assert!(session.preview.html().unwrap().contains("<!-- render 1 -->"));
        assert!(session.render.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_descriptions_are_not_sent_to_render() {
        let (scheduler, renderer, session) = setup();
        session
            .lock()
            .await
            .workspace
            .create(crate::workspace::NewFile::JobDescription {
                name: "job_description.txt".into(),
                content: "Rust".into(),
            })
            .unwrap();
        scheduler.render_now().await;
        assert_eq!(renderer.last_paths(), vec!["index.html", "styles.css"]);
    }
}
