use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go. The TUI owns the terminal, so it logs to a file.
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
}

// Logs go to stderr so `--json` output on stdout stays machine readable.
pub fn init_tracing(filter: &str, verbose: bool, target: LogTarget) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let stderr_layer = matches!(target, LogTarget::Stderr).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    // An unopenable log file means no logs, never a corrupted screen
    let file_layer = match target {
        LogTarget::File(path) => open_log_file(path).map(|file| {
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
        }),
        LogTarget::Stderr => None,
    };

    // try_init so a second call (tests, TUI relaunch) is harmless
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
