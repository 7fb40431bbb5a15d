use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "TABCALC_LOG";

/// Sends tracing output to `<dir>/tabcalc.log`; the terminal belongs to the UI.
/// Falls back to discarding output when the file cannot be opened.
pub fn init(dir: &Path) {
    let file = fs::create_dir_all(dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("tabcalc.log"))
    });
    let writer = match file {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(_) => BoxMakeWriter::new(io::sink),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "tabcalc=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
}
