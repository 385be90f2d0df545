//! Pledgecard
//!
//! Renders a person's details and a short pledge onto a fixed-layout
//! certificate, captures it as a shareable JPEG and hands the result to
//! external channels.
//!
//! # Pipeline
//!
//! - **Scale**: a responsive preview scale derived from a container width
//! - **Preview**: a cosmetic, top-left anchored shrink of the full-size certificate
//! - **Capture**: 2x supersampled rasterization of the off-screen certificate, JPEG encoded
//! - **Telemetry**: fire-and-forget submission to an append-only remote log
//! - **Dispatch**: file download, share links and clipboard through an injected [`platform::Environment`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pledgecard::capture::CaptureEngine;
//! use pledgecard::rendering::{template, SurfaceHandle, SurfaceHost};
//! use pledgecard::{Pledge, PledgeConfig, UserData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PledgeConfig::default();
//! let user = UserData {
//!     full_name: "Jane Doe".into(),
//!     phone: String::new(),
//!     custom_pledge: "Wear my watch every day".into(),
//! };
//!
//! let host = Arc::new(SurfaceHost::new());
//! let pledge = Pledge::custom(&user.custom_pledge);
//! host.mount(template::certificate_markup(&pledge, &user, config.logo_src.as_deref()));
//!
//! let engine = CaptureEngine::new(host, &config);
//! let artifact = engine.capture(&SurfaceHandle::capture_target(), &user.full_name)?;
//! println!("{} ({} bytes)", artifact.filename, artifact.bytes.len());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod async_api;
pub mod capture;
pub mod dispatch;
pub mod log_store;
pub mod platform;
pub mod preview;
pub mod rendering;
pub mod scale;
pub mod session;
pub mod telemetry;

// HTTP listener for the submission log
#[cfg(feature = "log-server")]
pub mod log_server;

pub use async_api::CaptureWorker;
pub use capture::{CaptureEngine, CapturedArtifact};
pub use dispatch::{Dispatcher, ShareOutcome, SharePlatform};
pub use scale::ScaleCalculator;
pub use telemetry::{SubmissionEvent, TelemetrySink};

/// Fixed authoring width of the certificate, in logical units.
pub const LOGICAL_WIDTH: u32 = 1080;
/// Fixed authoring height of the certificate, in logical units.
pub const LOGICAL_HEIGHT: u32 = 1440;

/// Deployed remote log script.
pub const DEFAULT_LOG_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbxnc_VlsezobFWwCrm8p3CEGc2JytrBbbEYhBY9T90pQeR12VHeHhcUsEyoQMqLCIFW/exec";

/// Details entered by the person taking the pledge.
///
/// Owned by the flow controller; the pipeline only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserData {
    pub full_name: String,
    pub phone: String,
    pub custom_pledge: String,
}

/// A selected pledge: either user-authored (`id == 0`) or a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pledge {
    pub id: u32,
    pub text: String,
    pub explanation: String,
}

impl Pledge {
    /// A user-authored pledge with no explanation.
    pub fn custom(text: &str) -> Self {
        Self { id: 0, text: text.to_string(), explanation: String::new() }
    }

    pub fn is_custom(&self) -> bool {
        self.id == 0
    }
}

/// Options applied by the capture engine
///
/// These are independent of whatever scale the interactive preview shows.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Rasterization multiplier over the logical size
    pub supersample: f32,
    /// JPEG quality in 1..=100
    pub jpeg_quality: u8,
    /// Solid fill beneath transparent regions
    pub background: [u8; 3],
    /// Whether cross-origin images are fetched at all
    pub use_cors: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            supersample: 2.0,
            jpeg_quality: 90,
            background: [255, 255, 255],
            use_cors: true,
        }
    }
}

/// Configuration for the certificate pipeline
///
/// The defaults mirror the deployed campaign. Override individual fields
/// with struct update syntax or overlay the environment with
/// [`PledgeConfig::from_env`].
///
/// # Examples
///
/// ```
/// let cfg = pledgecard::PledgeConfig::default();
/// assert_eq!(cfg.capture.jpeg_quality, 90);
/// ```
#[derive(Debug, Clone)]
pub struct PledgeConfig {
    /// Canonical application URL used in share links
    pub origin: String,
    /// Remote append-only log endpoint
    pub log_endpoint: String,
    /// User agent sent with outgoing requests
    pub user_agent: String,
    /// Timeout for outgoing requests in milliseconds
    pub request_timeout_ms: u64,
    /// Capture settings
    pub capture: CaptureOptions,
    /// Optional logo drawn on the certificate (data URI, file path or URL)
    pub logo_src: Option<String>,
    /// Directory receiving downloaded certificates
    pub download_dir: PathBuf,
    /// Font file for certificate text; a system sans-serif face when unset
    pub font_path: Option<PathBuf>,
}

impl Default for PledgeConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            log_endpoint: DEFAULT_LOG_ENDPOINT.to_string(),
            user_agent: concat!("pledgecard/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_ms: 10000,
            capture: CaptureOptions::default(),
            logo_src: None,
            download_dir: PathBuf::from("."),
            font_path: None,
        }
    }
}

impl PledgeConfig {
    /// Defaults overlaid with `PLEDGE_*` environment variables, then validated.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("PLEDGE_ORIGIN") {
            cfg.origin = v;
        }
        if let Some(v) = lookup("PLEDGE_LOG_ENDPOINT") {
            cfg.log_endpoint = v;
        }
        if let Some(v) = lookup("PLEDGE_DOWNLOAD_DIR") {
            cfg.download_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PLEDGE_LOGO_SRC") {
            cfg.logo_src = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = lookup("PLEDGE_FONT") {
            cfg.font_path = Some(v).filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        }
        if let Some(v) = lookup("PLEDGE_JPEG_QUALITY") {
            cfg.capture.jpeg_quality = v
                .trim()
                .parse()
                .map_err(|_| Error::ConfigError(format!("PLEDGE_JPEG_QUALITY is not a number: {}", v)))?;
        }
        if let Some(v) = lookup("PLEDGE_USE_CORS") {
            cfg.capture.use_cors = matches!(v.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("PLEDGE_TIMEOUT_MS") {
            cfg.request_timeout_ms = v
                .trim()
                .parse()
                .map_err(|_| Error::ConfigError(format!("PLEDGE_TIMEOUT_MS is not a number: {}", v)))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.origin)
            .map_err(|e| Error::ConfigError(format!("origin {:?}: {}", self.origin, e)))?;
        url::Url::parse(&self.log_endpoint)
            .map_err(|e| Error::ConfigError(format!("log endpoint {:?}: {}", self.log_endpoint, e)))?;
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(Error::ConfigError(format!(
                "jpeg quality must be within 1..=100, got {}",
                self.capture.jpeg_quality
            )));
        }
        if !(self.capture.supersample.is_finite() && self.capture.supersample > 0.0) {
            return Err(Error::ConfigError(format!(
                "supersample must be positive, got {}",
                self.capture.supersample
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = PledgeConfig::default();
        assert_eq!(config.capture.supersample, 2.0);
        assert_eq!(config.capture.background, [255, 255, 255]);
        assert!(config.capture.use_cors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overlay_applies_and_validates() {
        let vars: HashMap<&str, &str> = [
            ("PLEDGE_ORIGIN", "https://pledge.example.org"),
            ("PLEDGE_JPEG_QUALITY", "75"),
            ("PLEDGE_USE_CORS", "false"),
            ("PLEDGE_FONT", "/usr/share/fonts/custom.ttf"),
        ]
        .into_iter()
        .collect();
        let cfg = PledgeConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.origin, "https://pledge.example.org");
        assert_eq!(cfg.capture.jpeg_quality, 75);
        assert!(!cfg.capture.use_cors);
        assert_eq!(cfg.font_path.as_deref(), Some(std::path::Path::new("/usr/share/fonts/custom.ttf")));
    }

    #[test]
    fn invalid_quality_is_rejected() {
        let err = PledgeConfig::from_lookup(|k| (k == "PLEDGE_JPEG_QUALITY").then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = PledgeConfig::from_lookup(|k| (k == "PLEDGE_ORIGIN").then(|| "not a url".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn user_data_uses_camel_case_fields() {
        let user: UserData =
            serde_json::from_str(r#"{"fullName":"Jane Doe","customPledge":"Be on time"}"#).unwrap();
        assert_eq!(user.full_name, "Jane Doe");
        assert_eq!(user.phone, "");
        assert_eq!(user.custom_pledge, "Be on time");
    }

    #[test]
    fn custom_pledge_has_id_zero() {
        let p = Pledge::custom("Read more");
        assert!(p.is_custom());
        assert!(p.explanation.is_empty());
    }
}
