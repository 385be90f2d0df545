//! Capture engine: full-resolution certificate to JPEG artifact
//!
//! The engine resolves the off-screen capture target at call time,
//! rasterizes it at the configured supersampling factor (2x by default, so
//! 1080x1440 logical units become 2160x2880 pixels), flattens it onto white
//! and encodes a JPEG. Nothing the interactive preview does affects it.
//!
//! Overlapping captures are not serialized here; callers disable their
//! trigger while a capture is in flight (see [`crate::session::SuccessScreen`]).

use std::sync::Arc;

use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::rendering::{self, DefaultLoader, FontFace, ResourceLoader, SurfaceHandle, SurfaceHost};
use crate::{CaptureOptions, Error, PledgeConfig, Result};

/// Prefix of every generated file name.
pub const FILENAME_PREFIX: &str = "pledge_2026";
/// Base name used when the person left their name empty.
pub const FALLBACK_NAME: &str = "Manifestation";

/// An in-memory JPEG plus the name it should be saved under.
///
/// Held only while the download modal is open; never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedArtifact {
    pub bytes: Vec<u8>,
    pub data_uri: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl CapturedArtifact {
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    /// Hex SHA-256 of the encoded bytes.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// `pledge_2026_<name>.jpg` with every whitespace run in `full_name`
/// replaced by one underscore, or `pledge_2026_Manifestation.jpg` when the
/// name is empty. A name of only whitespace still becomes one underscore.
pub fn artifact_filename(full_name: &str) -> String {
    if full_name.is_empty() {
        return format!("{}_{}.jpg", FILENAME_PREFIX, FALLBACK_NAME);
    }
    let mut base = String::with_capacity(full_name.len());
    let mut in_space = false;
    for c in full_name.chars() {
        if c.is_whitespace() {
            if !in_space {
                base.push('_');
            }
            in_space = true;
        } else {
            base.push(c);
            in_space = false;
        }
    }
    format!("{}_{}.jpg", FILENAME_PREFIX, base)
}

pub struct CaptureEngine {
    host: Arc<SurfaceHost>,
    loader: Box<dyn ResourceLoader>,
    font: Option<FontFace>,
    options: CaptureOptions,
}

impl CaptureEngine {
    pub fn new(host: Arc<SurfaceHost>, config: &PledgeConfig) -> Self {
        Self::with_loader(host, config.capture.clone(), Box::new(DefaultLoader::new(config)))
            .with_font(FontFace::resolve(config.font_path.as_deref()))
    }

    /// An engine using the system font.
    pub fn with_loader(host: Arc<SurfaceHost>, options: CaptureOptions, loader: Box<dyn ResourceLoader>) -> Self {
        Self { host, loader, font: FontFace::system_default(), options }
    }

    pub fn with_font(mut self, font: Option<FontFace>) -> Self {
        self.font = font;
        self
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Rasterize and encode the subtree behind `handle`.
    ///
    /// Fails with [`Error::ElementNotFound`] before any rasterization when the
    /// handle does not resolve, and with [`Error::CaptureError`] when
    /// rasterization or encoding fails. No partial artifact is produced.
    pub fn capture(&self, handle: &SurfaceHandle, full_name: &str) -> Result<CapturedArtifact> {
        let surface = self.host.resolve(handle)?;

        let pixmap = rendering::render_surface(
            &surface,
            self.options.supersample,
            self.options.background,
            self.loader.as_ref(),
            self.font.as_ref(),
        )
        .map_err(into_capture_error)?;
        let bytes = rendering::encode_jpeg(&pixmap, self.options.jpeg_quality, self.options.background)
            .map_err(into_capture_error)?;

        let data_uri = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        let artifact = CapturedArtifact {
            filename: artifact_filename(full_name),
            width: pixmap.width(),
            height: pixmap.height(),
            bytes,
            data_uri,
        };
        log::debug!(
            "captured #{} as {} ({}x{}, {} bytes)",
            handle.id(),
            artifact.filename,
            artifact.width,
            artifact.height,
            artifact.bytes.len()
        );
        Ok(artifact)
    }
}

fn into_capture_error(err: Error) -> Error {
    match err {
        Error::CaptureError(_) => err,
        other => Error::CaptureError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_replaces_whitespace_runs() {
        assert_eq!(artifact_filename("Jane Doe"), "pledge_2026_Jane_Doe.jpg");
        assert_eq!(artifact_filename("A  B"), "pledge_2026_A_B.jpg");
        assert_eq!(artifact_filename("A \t\n B"), "pledge_2026_A_B.jpg");
        assert_eq!(artifact_filename(" Jane "), "pledge_2026__Jane_.jpg");
    }

    #[test]
    fn empty_name_falls_back() {
        assert_eq!(artifact_filename(""), "pledge_2026_Manifestation.jpg");
    }

    #[test]
    fn whitespace_only_name_collapses_to_one_underscore() {
        assert_eq!(artifact_filename("   "), "pledge_2026__.jpg");
        assert_eq!(artifact_filename("\t \n"), "pledge_2026__.jpg");
    }

    #[test]
    fn missing_target_fails_before_rasterizing() {
        struct PanicLoader;
        impl ResourceLoader for PanicLoader {
            fn load(&self, _src: &str) -> Result<Vec<u8>> {
                panic!("loader must not be reached");
            }
        }
        let host = Arc::new(SurfaceHost::new());
        host.mount(r#"<div id="somewhere-else"><img src="x.png"></div>"#);
        let engine = CaptureEngine::with_loader(host, CaptureOptions::default(), Box::new(PanicLoader));
        let err = engine.capture(&SurfaceHandle::capture_target(), "Jane").unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));
    }

    #[test]
    fn small_capture_produces_jpeg_data_uri() {
        let host = Arc::new(SurfaceHost::new());
        host.mount(r##"<div id="pledge-poster-capture" data-w="20" data-h="10" data-bg="#00ff00"></div>"##);
        let engine = CaptureEngine::new(host, &PledgeConfig::default());
        let a = engine.capture(&SurfaceHandle::capture_target(), "").unwrap();
        assert_eq!((a.width, a.height), (40, 20));
        assert!(a.data_uri.starts_with("data:image/jpeg;base64,"));
        assert_eq!(a.filename, "pledge_2026_Manifestation.jpg");
        assert_eq!(a.fingerprint().len(), 64);
    }
}
