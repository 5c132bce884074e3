use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Session log, recreated on every start
pub const LOG_FILE: &str = "stormvale.log";

/// Directives appended when `RUST_LOG` is absent
const QUIET_DEPENDENCIES: &[&str] = &["stormvale=debug", "eframe=warn", "egui_glow=warn", "winit=warn"];

#[derive(Debug, Clone)]
struct LogOptions {
    file: PathBuf,
    level: String,
    backtrace: bool,
}

impl LogOptions {
    fn from_env(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            backtrace: std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1"),
        }
    }

    fn filter(&self) -> anyhow::Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let mut filter = EnvFilter::new(&self.level);
        for directive in QUIET_DEPENDENCIES {
            filter = filter.add_directive(directive.parse()?);
        }
        Ok(filter)
    }
}

/// Console plus session file logging.
///
/// `RUST_LOG`, when set, replaces the built-in filter. Fails if a global
/// subscriber is already installed.
pub fn init_logging(log_file: impl AsRef<Path>) -> anyhow::Result<()> {
    let options = LogOptions::from_env(log_file.as_ref());
    // File::create truncates, so each run starts with an empty log
    let file = File::create(&options.file)?;

    let console = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);
    let session = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(options.filter()?)
        .with(console)
        .with(session)
        .try_init()?;

    install_panic_hook(options.backtrace);
    tracing::info!(level = %options.level, file = ?options.file, backtrace = options.backtrace, "logging ready");
    Ok(())
}

fn install_panic_hook(backtrace: bool) {
    std::panic::set_hook(Box::new(move |info| {
        let at = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(%at, "panic: {}", info);
        if backtrace {
            tracing::error!("{}", std::backtrace::Backtrace::force_capture());
        }
    }));
}

/// One-off environment dump at startup
pub fn log_system_info() {
    tracing::info!(
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        version = env!("CARGO_PKG_VERSION"),
        cpus = num_cpus::get(),
        physics = cfg!(feature = "physics"),
        "system"
    );
}
