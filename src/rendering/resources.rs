//! Image loading for certificate content
//!
//! Images may come from `data:` URIs, local files or HTTP. HTTP images on a
//! different origin than the application are only fetched when CORS loading
//! is enabled; any failure is reported to the rasterizer, which leaves the
//! image area blank instead of failing the capture.

use std::path::Path;
#[cfg(feature = "remote-log")]
use std::time::Duration;

use base64::Engine as _;
use url::Url;

use crate::{Error, PledgeConfig, Result};

pub trait ResourceLoader: Send + Sync {
    /// Fetch the raw bytes behind `src`.
    fn load(&self, src: &str) -> Result<Vec<u8>>;
}

/// Loader used by the capture engine.
#[derive(Debug, Clone)]
pub struct DefaultLoader {
    origin: Option<Url>,
    use_cors: bool,
    #[cfg_attr(not(feature = "remote-log"), allow(dead_code))]
    timeout_ms: u64,
    #[cfg_attr(not(feature = "remote-log"), allow(dead_code))]
    user_agent: String,
}

impl DefaultLoader {
    pub fn new(config: &PledgeConfig) -> Self {
        Self {
            origin: Url::parse(&config.origin).ok(),
            use_cors: config.capture.use_cors,
            timeout_ms: config.request_timeout_ms,
            user_agent: config.user_agent.clone(),
        }
    }

    fn is_cross_origin(&self, url: &Url) -> bool {
        match &self.origin {
            Some(origin) => origin.origin() != url.origin(),
            None => true,
        }
    }

    // The blocking client owns a runtime of its own, which may not be
    // created or dropped on a thread that is driving a tokio runtime.
    #[cfg(feature = "remote-log")]
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        if tokio::runtime::Handle::try_current().is_err() {
            return self.fetch_blocking(url);
        }
        std::thread::scope(|s| {
            s.spawn(|| self.fetch_blocking(url))
                .join()
                .unwrap_or_else(|_| Err(Error::ResourceError(format!("fetch of {} panicked", url))))
        })
    }

    #[cfg(feature = "remote-log")]
    fn fetch_blocking(&self, url: &Url) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        let resp = client
            .get(url.as_str())
            .send()
            .map_err(|e| Error::ResourceError(format!("Failed to fetch {}: {}", url, e)))?;
        if !resp.status().is_success() {
            return Err(Error::ResourceError(format!("{} returned {}", url, resp.status())));
        }
        let body = resp
            .bytes()
            .map_err(|e| Error::ResourceError(format!("Failed to read {}: {}", url, e)))?;
        Ok(body.to_vec())
    }

    #[cfg(not(feature = "remote-log"))]
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        Err(Error::ResourceError(format!("HTTP images are disabled: {}", url)))
    }
}

impl ResourceLoader for DefaultLoader {
    fn load(&self, src: &str) -> Result<Vec<u8>> {
        if src.starts_with("data:") {
            return decode_data_uri(src);
        }
        match Url::parse(src) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                if self.is_cross_origin(&url) && !self.use_cors {
                    return Err(Error::ResourceError(format!("cross-origin image blocked: {}", url)));
                }
                self.fetch(&url)
            }
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::ResourceError(format!("bad file URL: {}", src)))?;
                read_file(&path)
            }
            Err(url::ParseError::RelativeUrlWithoutBase) if Path::new(src).is_absolute() && Path::new(src).exists() => {
                read_file(Path::new(src))
            }
            // other root-relative references resolve against the application origin
            Err(url::ParseError::RelativeUrlWithoutBase) if src.starts_with('/') && self.origin.is_some() => {
                match self.origin.as_ref().and_then(|o| o.join(src).ok()) {
                    Some(url) => self.fetch(&url),
                    None => Err(Error::ResourceError(format!("cannot resolve {}", src))),
                }
            }
            _ => read_file(Path::new(src)),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::ResourceError(format!("{}: {}", path.display(), e)))
}

/// Decode the payload of a `data:` URI (base64 or percent-encoded).
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| Error::ResourceError("not a data URI".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::ResourceError("data URI has no payload".into()))?;
    if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::ResourceError(format!("invalid base64 in data URI: {}", e)))
    } else {
        Ok(percent_encoding::percent_decode_str(payload).collect())
    }
}
