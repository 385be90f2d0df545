//! Screens that drive the pipeline
//!
//! [`PreviewScreen`] keeps the responsive preview scale and confirms the
//! pledge; [`SuccessScreen`] owns the download button's busy flag, the
//! download modal and the share actions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::async_api::CaptureWorker;
use crate::capture::CapturedArtifact;
use crate::dispatch::{Dispatcher, ShareOutcome};
use crate::preview::{Preview, PreviewRenderer};
use crate::rendering::{Surface, SurfaceHandle};
use crate::scale::ScaleCalculator;
use crate::telemetry::{SubmissionEvent, TelemetrySink};
use crate::{Error, Pledge, Result, UserData};

pub const CAPTURE_NOT_FOUND_MESSAGE: &str = "Error: Capture element not found.";
pub const CAPTURE_FAILED_MESSAGE: &str = "Sorry, we couldn't generate the image. Please take a screenshot!";
pub const COPY_FAILED_MESSAGE: &str = "Couldn't copy the link. Please copy it from the address bar.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Details,
    Preview,
    Success,
}

pub struct PreviewScreen {
    pledge: Pledge,
    user: UserData,
    calculator: ScaleCalculator,
    renderer: PreviewRenderer,
}

impl PreviewScreen {
    pub fn new(pledge: Pledge, user: UserData) -> Self {
        Self { pledge, user, calculator: ScaleCalculator::new(), renderer: PreviewRenderer::new() }
    }

    pub fn pledge(&self) -> &Pledge {
        &self.pledge
    }

    pub fn user(&self) -> &UserData {
        &self.user
    }

    /// Called at mount and from every resize callback.
    pub fn on_resize(&mut self, container_width: f64) -> f64 {
        self.calculator.observe(container_width)
    }

    pub fn scale(&self) -> f64 {
        self.calculator.scale()
    }

    pub fn preview(&self, surface: &Surface) -> Preview {
        self.renderer.compose(surface, self.scale())
    }

    /// Record the submission and advance. The sink is never waited on.
    pub fn confirm(&self, sink: &dyn TelemetrySink) -> Step {
        sink.record(SubmissionEvent::from_user(&self.user));
        Step::Success
    }

    pub fn back(&self) -> Step {
        Step::Details
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Captured, saved under this name, modal open
    Saved(String),
    /// A download is already running; nothing was started
    Busy,
    /// The user was alerted; no artifact exists
    Failed,
}

// Clears the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SuccessScreen {
    user: UserData,
    target: SurfaceHandle,
    worker: CaptureWorker,
    dispatcher: Dispatcher,
    downloading: AtomicBool,
    modal: Mutex<Option<CapturedArtifact>>,
}

impl SuccessScreen {
    pub fn new(user: UserData, worker: CaptureWorker, dispatcher: Dispatcher) -> Self {
        Self {
            user,
            target: SurfaceHandle::capture_target(),
            worker,
            dispatcher,
            downloading: AtomicBool::new(false),
            modal: Mutex::new(None),
        }
    }

    /// The pledge shown on this screen: always the user's own text.
    pub fn pledge(&self) -> Pledge {
        Pledge::custom(&self.user.custom_pledge)
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading.load(Ordering::SeqCst)
    }

    /// Capture the certificate, save it and open the modal.
    pub async fn download(&self) -> DownloadOutcome {
        if self
            .downloading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("download already in progress");
            return DownloadOutcome::Busy;
        }
        let _busy = BusyGuard(&self.downloading);

        let env = self.dispatcher.environment();
        let artifact = match self.worker.capture(&self.target, &self.user.full_name).await {
            Ok(a) => a,
            Err(Error::ElementNotFound(id)) => {
                log::error!("capture target #{} is not mounted", id);
                env.alert(CAPTURE_NOT_FOUND_MESSAGE);
                return DownloadOutcome::Failed;
            }
            Err(e) => {
                log::error!("download error: {}", e);
                env.alert(CAPTURE_FAILED_MESSAGE);
                return DownloadOutcome::Failed;
            }
        };

        if let Err(e) = self.dispatcher.download(&artifact) {
            log::error!("download error: {}", e);
            env.alert(CAPTURE_FAILED_MESSAGE);
            return DownloadOutcome::Failed;
        }
        let filename = artifact.filename.clone();
        *self.modal.lock().unwrap_or_else(PoisonError::into_inner) = Some(artifact);
        DownloadOutcome::Saved(filename)
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// The artifact shown in the open modal.
    pub fn modal_artifact(&self) -> Option<CapturedArtifact> {
        self.modal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Close the modal, discarding the artifact.
    pub fn close_modal(&self) {
        self.modal.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn share(&self, platform: &str) -> Result<ShareOutcome> {
        self.dispatcher.share_named(platform)
    }

    /// Copy the share message; a failed write is reported to the user.
    pub fn copy_link(&self) -> Result<()> {
        self.dispatcher.copy_link().map_err(|e| {
            log::warn!("copy link: {}", e);
            self.dispatcher.environment().alert(COPY_FAILED_MESSAGE);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Collecting(Mutex<Vec<SubmissionEvent>>);

    impl TelemetrySink for Collecting {
        fn record(&self, event: SubmissionEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn confirm_records_and_advances() {
        let user = UserData { full_name: "Jane".into(), phone: "1".into(), custom_pledge: "Walk".into() };
        let screen = PreviewScreen::new(Pledge::custom("Walk"), user);
        let sink = Arc::new(Collecting(Mutex::new(Vec::new())));
        assert_eq!(screen.confirm(sink.as_ref()), Step::Success);
        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resolution, "Walk");
        assert_eq!(screen.back(), Step::Details);
    }

    #[test]
    fn resize_updates_scale() {
        let mut screen = PreviewScreen::new(Pledge::default(), UserData::default());
        assert_eq!(screen.scale(), crate::scale::DEFAULT_PREVIEW_SCALE);
        assert_eq!(screen.on_resize(540.0), 0.5);
        assert_eq!(screen.scale(), 0.5);
    }

    #[test]
    fn busy_guard_resets_flag() {
        let flag = AtomicBool::new(true);
        {
            let _g = BusyGuard(&flag);
        }
        assert!(!flag.load(Ordering::SeqCst));
    }
}
