//! Integration tests for the success screen: download, modal, share and copy

use std::sync::Arc;

use pledgecard::dispatch::{share_url, COPIED_NOTICE};
use pledgecard::platform::NoopEnvironment;
use pledgecard::rendering::{template, SurfaceHost};
use pledgecard::session::{
    DownloadOutcome, SuccessScreen, CAPTURE_FAILED_MESSAGE, CAPTURE_NOT_FOUND_MESSAGE, COPY_FAILED_MESSAGE,
};
use pledgecard::{CaptureEngine, CaptureWorker, Dispatcher, PledgeConfig, ShareOutcome, SharePlatform, UserData};

const ORIGIN: &str = "https://pledge.example.org";

fn jane() -> UserData {
    UserData {
        full_name: "Jane Doe".into(),
        phone: "1234".into(),
        custom_pledge: "Wear my watch every day".into(),
    }
}

fn screen_with(host: Arc<SurfaceHost>, env: Arc<NoopEnvironment>) -> (SuccessScreen, CaptureWorker) {
    let worker = CaptureWorker::spawn(CaptureEngine::new(host, &PledgeConfig::default()));
    let screen = SuccessScreen::new(jane(), worker.clone(), Dispatcher::new(env));
    (screen, worker)
}

fn mounted_success() -> Arc<SurfaceHost> {
    let host = Arc::new(SurfaceHost::new());
    host.mount(template::success_markup(&jane(), None));
    host
}

#[tokio::test]
async fn download_saves_and_opens_modal() {
    let env = Arc::new(NoopEnvironment::new(ORIGIN));
    let (screen, worker) = screen_with(mounted_success(), env.clone());

    assert_eq!(screen.download().await, DownloadOutcome::Saved("pledge_2026_Jane_Doe.jpg".into()));
    assert!(!screen.is_downloading());
    assert!(screen.is_modal_open());

    let saved = env.recorded().saved;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, "pledge_2026_Jane_Doe.jpg");
    let modal = screen.modal_artifact().unwrap();
    assert_eq!(saved[0].1, modal.bytes);
    assert_eq!((modal.width, modal.height), (2160, 2880));

    screen.close_modal();
    assert!(!screen.is_modal_open());
    assert!(screen.modal_artifact().is_none());
    worker.close().await.unwrap();
}

#[tokio::test]
async fn second_click_while_busy_is_ignored() {
    let env = Arc::new(NoopEnvironment::new(ORIGIN));
    let (screen, worker) = screen_with(mounted_success(), env.clone());

    let (a, b) = tokio::join!(screen.download(), screen.download());
    let mut outcomes = vec![a, b];
    outcomes.sort_by_key(|o| matches!(o, DownloadOutcome::Busy));
    assert!(matches!(outcomes[0], DownloadOutcome::Saved(_)));
    assert_eq!(outcomes[1], DownloadOutcome::Busy);
    assert_eq!(env.recorded().saved.len(), 1);

    // the flag is released, so a later click works again
    assert!(matches!(screen.download().await, DownloadOutcome::Saved(_)));
    worker.close().await.unwrap();
}

#[tokio::test]
async fn unmounted_target_alerts_and_resets() {
    let env = Arc::new(NoopEnvironment::new(ORIGIN));
    let (screen, worker) = screen_with(Arc::new(SurfaceHost::new()), env.clone());

    assert_eq!(screen.download().await, DownloadOutcome::Failed);
    assert!(!screen.is_downloading());
    assert!(!screen.is_modal_open());

    let recorded = env.recorded();
    assert!(recorded.saved.is_empty());
    assert_eq!(recorded.alerts, vec![CAPTURE_NOT_FOUND_MESSAGE.to_string()]);
    worker.close().await.unwrap();
}

#[tokio::test]
async fn zero_area_target_alerts_capture_failure_and_resets() {
    let env = Arc::new(NoopEnvironment::new(ORIGIN));
    let host = Arc::new(SurfaceHost::new());
    host.mount(r#"<div id="pledge-poster-capture" data-w="0" data-h="10"></div>"#);
    let (screen, worker) = screen_with(host, env.clone());

    assert_eq!(screen.download().await, DownloadOutcome::Failed);
    assert!(!screen.is_downloading());
    assert!(!screen.is_modal_open());
    let recorded = env.recorded();
    assert!(recorded.saved.is_empty());
    assert_eq!(recorded.alerts, vec![CAPTURE_FAILED_MESSAGE.to_string()]);

    // not stuck busy: the next click runs and fails the same way
    assert_eq!(screen.download().await, DownloadOutcome::Failed);
    assert_eq!(env.recorded().alerts.len(), 2);
    worker.close().await.unwrap();
}

#[tokio::test]
async fn closed_worker_is_reported_as_capture_failure() {
    let env = Arc::new(NoopEnvironment::new(ORIGIN));
    let (screen, worker) = screen_with(mounted_success(), env.clone());
    worker.close().await.unwrap();

    assert_eq!(screen.download().await, DownloadOutcome::Failed);
    assert_eq!(env.recorded().alerts.len(), 1);
    assert_ne!(env.recorded().alerts[0], CAPTURE_NOT_FOUND_MESSAGE);
}

#[tokio::test]
async fn share_and_copy_go_through_environment() {
    let env = Arc::new(NoopEnvironment::new(ORIGIN));
    let (screen, worker) = screen_with(mounted_success(), env.clone());

    let expected = share_url(SharePlatform::WhatsApp, ORIGIN);
    assert_eq!(screen.share("whatsapp").unwrap(), ShareOutcome::Opened(expected.clone()));
    assert_eq!(screen.share("carrier-pigeon").unwrap(), ShareOutcome::Ignored);
    screen.copy_link().unwrap();

    let recorded = env.recorded();
    assert_eq!(recorded.opened, vec![expected]);
    assert_eq!(
        recorded.clipboard.as_deref(),
        Some("I just pledged my watch! Join me here:\nhttps://pledge.example.org")
    );
    assert_eq!(recorded.alerts, vec![COPIED_NOTICE.to_string()]);
    worker.close().await.unwrap();
}

#[tokio::test]
async fn denied_clipboard_is_reported() {
    let env = Arc::new(NoopEnvironment::new(ORIGIN).with_clipboard_denied());
    let (screen, worker) = screen_with(mounted_success(), env.clone());

    assert!(screen.copy_link().is_err());
    assert_eq!(env.recorded().alerts, vec![COPY_FAILED_MESSAGE.to_string()]);
    worker.close().await.unwrap();
}
