//! Environment capability: origin, external navigation, clipboard, file save and alerts
//!
//! Everything the pipeline does to the world outside the process goes
//! through [`Environment`], so production code binds to the desktop and
//! tests bind to [`NoopEnvironment`].

pub mod desktop;

pub use desktop::DesktopEnvironment;

use std::sync::{Mutex, PoisonError};

use crate::{Error, Result};

pub trait Environment: Send + Sync {
    /// Canonical origin of the application, e.g. `https://pledge.example.org`.
    fn origin(&self) -> String;
    /// Open `url` in a new browsing context.
    fn open_external(&self, url: &str) -> Result<()>;
    fn write_clipboard(&self, text: &str) -> Result<()>;
    /// Save `bytes` under `filename`; returns once the save has been handed off.
    fn save_file(&self, bytes: &[u8], filename: &str) -> Result<()>;
    /// Show a short message to the user.
    fn alert(&self, message: &str);
}

/// Everything a [`NoopEnvironment`] was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recorded {
    pub opened: Vec<String>,
    pub clipboard: Option<String>,
    pub saved: Vec<(String, Vec<u8>)>,
    pub alerts: Vec<String>,
}

/// In-memory environment that records effects instead of performing them.
pub struct NoopEnvironment {
    origin: String,
    deny_clipboard: bool,
    state: Mutex<Recorded>,
}

impl NoopEnvironment {
    pub fn new(origin: impl Into<String>) -> Self {
        NoopEnvironment {
            origin: origin.into(),
            deny_clipboard: false,
            state: Mutex::new(Recorded::default()),
        }
    }

    /// Make every clipboard write fail as if permission were denied.
    pub fn with_clipboard_denied(mut self) -> Self {
        self.deny_clipboard = true;
        self
    }

    pub fn recorded(&self) -> Recorded {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn with_state<F: FnOnce(&mut Recorded)>(&self, f: F) {
        let mut g = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut g);
    }
}

impl Default for NoopEnvironment {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

impl Environment for NoopEnvironment {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn open_external(&self, url: &str) -> Result<()> {
        self.with_state(|s| s.opened.push(url.to_string()));
        Ok(())
    }

    fn write_clipboard(&self, text: &str) -> Result<()> {
        if self.deny_clipboard {
            return Err(Error::ClipboardError("permission denied".into()));
        }
        self.with_state(|s| s.clipboard = Some(text.to_string()));
        Ok(())
    }

    fn save_file(&self, bytes: &[u8], filename: &str) -> Result<()> {
        self.with_state(|s| s.saved.push((filename.to_string(), bytes.to_vec())));
        Ok(())
    }

    fn alert(&self, message: &str) {
        self.with_state(|s| s.alerts.push(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_environment_records_effects() {
        let env = NoopEnvironment::new("https://pledge.example.org");
        assert_eq!(env.origin(), "https://pledge.example.org");
        env.open_external("https://a.example/").unwrap();
        env.write_clipboard("hello").unwrap();
        env.save_file(b"jpg", "a.jpg").unwrap();
        env.alert("done");

        let r = env.recorded();
        assert_eq!(r.opened, vec!["https://a.example/".to_string()]);
        assert_eq!(r.clipboard.as_deref(), Some("hello"));
        assert_eq!(r.saved, vec![("a.jpg".to_string(), b"jpg".to_vec())]);
        assert_eq!(r.alerts, vec!["done".to_string()]);
    }

    #[test]
    fn denied_clipboard_fails_without_recording() {
        let env = NoopEnvironment::default().with_clipboard_denied();
        assert!(matches!(env.write_clipboard("x"), Err(Error::ClipboardError(_))));
        assert_eq!(env.recorded().clipboard, None);
    }
}
