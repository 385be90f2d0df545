use crate::capture::{CaptureEngine, CapturedArtifact};
use crate::rendering::SurfaceHandle;
use crate::{Error, Result};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Capture(SurfaceHandle, String, oneshot::Sender<Result<CapturedArtifact>>),
    Close(oneshot::Sender<()>),
}

/// An async-friendly capture facade backed by a dedicated worker thread.
///
/// The worker owns a synchronous [`CaptureEngine`] and runs one capture at a
/// time, so awaiting [`capture`](Self::capture) suspends the calling task
/// until rasterization and encoding have finished without blocking the
/// executor.
#[derive(Clone)]
pub struct CaptureWorker {
    cmd_tx: Sender<Command>,
}

impl CaptureWorker {
    /// Move `engine` onto a new worker thread.
    pub fn spawn(engine: CaptureEngine) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

        thread::spawn(move || {
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Capture(handle, full_name, resp) => {
                        let res = engine.capture(&handle, &full_name);
                        let _ = resp.send(res);
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(());
                        break;
                    }
                }
            }
            log::debug!("capture worker stopped");
        });

        Self { cmd_tx }
    }

    /// Capture the subtree behind `handle` on the worker thread.
    pub async fn capture(&self, handle: &SurfaceHandle, full_name: &str) -> Result<CapturedArtifact> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Capture(handle.clone(), full_name.to_string(), tx))
            .map_err(|_| Error::CaptureError("capture worker is not running".into()))?;
        rx.await
            .map_err(|e| Error::CaptureError(format!("Capture canceled: {}", e)))?
    }

    /// Stop the worker after any queued captures.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::SurfaceHost;
    use crate::PledgeConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn worker_captures_and_closes() {
        let host = Arc::new(SurfaceHost::new());
        host.mount(r#"<div id="pledge-poster-capture" data-w="8" data-h="8"></div>"#);
        let worker = CaptureWorker::spawn(CaptureEngine::new(host, &PledgeConfig::default()));

        let a = worker.capture(&SurfaceHandle::capture_target(), "Jane Doe").await.unwrap();
        assert_eq!((a.width, a.height), (16, 16));
        assert_eq!(a.filename, "pledge_2026_Jane_Doe.jpg");

        let err = worker.capture(&SurfaceHandle::new("nope"), "x").await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));

        worker.clone().close().await.unwrap();
        let err = worker.capture(&SurfaceHandle::capture_target(), "x").await.unwrap_err();
        assert!(matches!(err, Error::CaptureError(_)));
    }
}
