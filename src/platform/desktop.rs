//! Desktop binding of the environment capability
//!
//! Links open through the system opener, the clipboard is written by piping
//! into the platform's clipboard tool, and downloads land in a directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use super::Environment;
use crate::{Error, PledgeConfig, Result};

pub struct DesktopEnvironment {
    origin: String,
    download_dir: PathBuf,
}

impl DesktopEnvironment {
    pub fn new(config: &PledgeConfig) -> Self {
        Self {
            origin: config.origin.trim_end_matches('/').to_string(),
            download_dir: config.download_dir.clone(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

fn opener_command(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    }
}

fn clipboard_commands() -> Vec<(&'static str, Vec<&'static str>)> {
    if cfg!(target_os = "macos") {
        vec![("pbcopy", vec![])]
    } else if cfg!(target_os = "windows") {
        vec![("clip", vec![])]
    } else {
        vec![("wl-copy", vec![]), ("xclip", vec!["-selection", "clipboard"]), ("xsel", vec!["--clipboard", "--input"])]
    }
}

fn pipe_into(program: &str, args: &[&str], text: &str) -> std::io::Result<bool> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    feed_and_wait(&mut child, text)
}

// The child is reaped even when it stops reading before taking all of `text`.
fn feed_and_wait(child: &mut Child, text: &str) -> std::io::Result<bool> {
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };
    let status = child.wait()?;
    written?;
    Ok(status.success())
}

impl Environment for DesktopEnvironment {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn open_external(&self, url: &str) -> Result<()> {
        // detached; the opener's own lifetime is not our concern
        opener_command(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| Error::EnvironmentError(format!("Failed to open {}: {}", url, e)))
    }

    fn write_clipboard(&self, text: &str) -> Result<()> {
        let mut last_err = String::from("no clipboard tool available");
        for (program, args) in clipboard_commands() {
            match pipe_into(program, &args, text) {
                Ok(true) => return Ok(()),
                Ok(false) => last_err = format!("{} exited with an error", program),
                Err(e) => last_err = format!("{}: {}", program, e),
            }
        }
        Err(Error::ClipboardError(last_err))
    }

    fn save_file(&self, bytes: &[u8], filename: &str) -> Result<()> {
        // keep the file inside the download directory
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| Error::EnvironmentError(format!("invalid file name {:?}", filename)))?;
        std::fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(name);
        std::fs::write(&path, bytes)
            .map_err(|e| Error::EnvironmentError(format!("Failed to save {}: {}", path.display(), e)))?;
        log::debug!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }
}
