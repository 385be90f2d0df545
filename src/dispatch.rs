//! Distribution of a captured certificate or the share link

use std::str::FromStr;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::capture::CapturedArtifact;
use crate::platform::Environment;
use crate::{Error, Result};

/// First line of every shared message.
pub const SHARE_HEADLINE: &str = "I just pledged my watch! Join me here:";

/// Shown after the share message reaches the clipboard.
pub const COPIED_NOTICE: &str = "Link Copied!";

// Characters left unescaped by encodeURIComponent
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharePlatform {
    WhatsApp,
    LinkedIn,
}

impl FromStr for SharePlatform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(SharePlatform::WhatsApp),
            "linkedin" => Ok(SharePlatform::LinkedIn),
            other => Err(Error::Other(format!("unsupported share platform {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// A share target was opened at this URL
    Opened(String),
    /// The platform is not supported; nothing happened
    Ignored,
}

/// The two-line message shared to messaging apps and the clipboard.
pub fn share_message(origin: &str) -> String {
    format!("{}\n{}", SHARE_HEADLINE, origin)
}

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Deterministic share URL for `platform`.
pub fn share_url(platform: SharePlatform, origin: &str) -> String {
    match platform {
        SharePlatform::WhatsApp => format!(
            "https://api.whatsapp.com/send?text={}",
            encode_component(&share_message(origin))
        ),
        SharePlatform::LinkedIn => format!(
            "https://www.linkedin.com/sharing/share-offsite/?url={}",
            encode_component(origin)
        ),
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    env: Arc<dyn Environment>,
}

impl Dispatcher {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Arc<dyn Environment> {
        &self.env
    }

    /// Save the artifact's JPEG under its derived file name.
    pub fn download(&self, artifact: &CapturedArtifact) -> Result<()> {
        self.env.save_file(&artifact.bytes, &artifact.filename)
    }

    /// Open the share target for `platform`. `None` (an unrecognised
    /// platform) does nothing and is not an error.
    pub fn share(&self, platform: Option<SharePlatform>) -> Result<ShareOutcome> {
        let Some(platform) = platform else {
            log::debug!("ignoring share to unsupported platform");
            return Ok(ShareOutcome::Ignored);
        };
        let url = share_url(platform, &self.env.origin());
        self.env.open_external(&url)?;
        Ok(ShareOutcome::Opened(url))
    }

    /// Like [`share`](Self::share) for a platform name as it arrives from the UI.
    pub fn share_named(&self, platform: &str) -> Result<ShareOutcome> {
        self.share(platform.parse().ok())
    }

    /// Put the share message on the clipboard and confirm to the user.
    ///
    /// A failed write is returned to the caller and no confirmation is shown.
    pub fn copy_link(&self) -> Result<()> {
        let text = share_message(&self.env.origin());
        self.env.write_clipboard(&text)?;
        self.env.alert(COPIED_NOTICE);
        Ok(())
    }
}
