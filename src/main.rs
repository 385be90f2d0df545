use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use pledgecard::dispatch::Dispatcher;
use pledgecard::platform::{DesktopEnvironment, Environment};
use pledgecard::preview::PreviewRenderer;
use pledgecard::rendering::{encode_png, template, DefaultLoader, SurfaceHandle, SurfaceHost};
use pledgecard::session::{DownloadOutcome, PreviewScreen, Step, SuccessScreen};
use pledgecard::telemetry::RemoteLogger;
use pledgecard::{CaptureEngine, CaptureWorker, Pledge, PledgeConfig, UserData};

#[derive(Parser)]
#[command(name = "pledgecard", version, about = "Render, capture and share pledge certificates")]
struct Cli {
    /// Canonical application URL used in share links
    #[arg(long, global = true)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the certificate as a JPEG and save it
    Capture {
        #[command(flatten)]
        user: UserArgs,
        /// Directory receiving the JPEG
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Render a scaled preview for a container width
    Preview {
        #[command(flatten)]
        user: UserArgs,
        /// Container width in layout units
        #[arg(long, default_value_t = 384.0)]
        width: f64,
        #[arg(long, default_value = "preview.png")]
        out: PathBuf,
    },
    /// Confirm the pledge and send it to the remote log
    Submit {
        #[command(flatten)]
        user: UserArgs,
        /// Remote log endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// How long to let the request finish before exiting
        #[arg(long, default_value_t = 3000)]
        linger_ms: u64,
    },
    /// Open a share target (whatsapp, linkedin)
    Share { platform: String },
    /// Copy the share message to the clipboard
    CopyLink,
    /// Run the submission log endpoint
    #[cfg(feature = "log-server")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: String,
        /// Append rows to this JSON-lines file instead of memory
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[derive(Args)]
struct UserArgs {
    /// JSON file with fullName, phone and customPledge
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    pledge: Option<String>,
}

impl UserArgs {
    fn load(&self) -> anyhow::Result<UserData> {
        let mut user = match &self.data {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            None => UserData::default(),
        };
        if let Some(v) = &self.name {
            user.full_name = v.clone();
        }
        if let Some(v) = &self.phone {
            user.phone = v.clone();
        }
        if let Some(v) = &self.pledge {
            user.custom_pledge = v.clone();
        }
        Ok(user)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = PledgeConfig::from_env()?;
    if let Some(origin) = cli.origin {
        config.origin = origin;
    }

    match cli.command {
        Command::Capture { user, out_dir } => {
            if let Some(dir) = out_dir {
                config.download_dir = dir;
            }
            config.validate()?;
            let user = user.load()?;

            let host = Arc::new(SurfaceHost::new());
            host.mount(template::success_markup(&user, config.logo_src.as_deref()));
            let worker = CaptureWorker::spawn(CaptureEngine::new(host, &config));
            let env: Arc<dyn Environment> = Arc::new(DesktopEnvironment::new(&config));
            let screen = SuccessScreen::new(user, worker.clone(), Dispatcher::new(env));

            let outcome = screen.download().await;
            worker.close().await?;
            match outcome {
                DownloadOutcome::Saved(name) => {
                    println!("Your poster is ready: {}", config.download_dir.join(name).display());
                }
                DownloadOutcome::Busy => bail!("a download is already running"),
                DownloadOutcome::Failed => bail!("capture failed"),
            }
        }
        Command::Preview { user, width, out } => {
            config.validate()?;
            let user = user.load()?;
            let mut screen = PreviewScreen::new(Pledge::custom(&user.custom_pledge), user);
            let scale = screen.on_resize(width);

            let host = SurfaceHost::new();
            host.mount(template::certificate_markup(screen.pledge(), screen.user(), config.logo_src.as_deref()));
            let surface = host.resolve(&SurfaceHandle::capture_target())?;
            let preview = screen.preview(&surface);
            // image fetches block, so rasterize off the runtime thread
            let loader = DefaultLoader::new(&config);
            let png = tokio::task::spawn_blocking(move || {
                PreviewRenderer::new()
                    .thumbnail(&surface, scale, &loader)
                    .and_then(|pixmap| encode_png(&pixmap))
            })
            .await??;
            std::fs::write(&out, png).with_context(|| format!("writing {}", out.display()))?;
            let (w, h) = preview.frame.displayed_size();
            println!(
                "{} (origin {}, {} paint commands) -> {:.0}x{:.0} at {}",
                preview.frame.css_transform(),
                preview.frame.css_transform_origin(),
                preview.commands.len(),
                w,
                h,
                out.display()
            );
        }
        Command::Submit { user, endpoint, linger_ms } => {
            if let Some(endpoint) = endpoint {
                config.log_endpoint = endpoint;
            }
            config.validate()?;
            let user = user.load()?;
            let logger = RemoteLogger::new(&config)?;
            let screen = PreviewScreen::new(Pledge::custom(&user.custom_pledge), user);
            if screen.confirm(&logger) == Step::Success {
                println!("Pledge confirmed.");
            }
            if !logger.drain(Duration::from_millis(linger_ms)) {
                eprintln!("remote log still pending; exiting anyway");
            }
        }
        Command::Share { platform } => {
            config.validate()?;
            let env: Arc<dyn Environment> = Arc::new(DesktopEnvironment::new(&config));
            match Dispatcher::new(env).share_named(&platform)? {
                pledgecard::ShareOutcome::Opened(url) => println!("{}", url),
                pledgecard::ShareOutcome::Ignored => eprintln!("unsupported platform {:?}", platform),
            }
        }
        Command::CopyLink => {
            config.validate()?;
            let env: Arc<dyn Environment> = Arc::new(DesktopEnvironment::new(&config));
            Dispatcher::new(env).copy_link()?;
        }
        #[cfg(feature = "log-server")]
        Command::Serve { addr, store } => {
            use pledgecard::log_server::LogServer;
            use pledgecard::log_store::{AppendOnlyLog, JsonlLog, MemoryLog};

            let store: Arc<dyn AppendOnlyLog> = match store {
                Some(path) => Arc::new(JsonlLog::new(path)),
                None => Arc::new(MemoryLog::new()),
            };
            let server = LogServer::bind(&addr, store)?;
            match server.local_addr() {
                Some(a) => println!("listening on http://{}", a),
                None => println!("listening on {}", addr),
            }
            tokio::task::spawn_blocking(move || server.run()).await?;
        }
    }
    Ok(())
}
