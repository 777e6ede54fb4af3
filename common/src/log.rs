use std::sync::Once;

use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy)]
pub enum LogTarget {
    Stdout,
    /// Rolling daily file under `dir`, merged with stdout.
    File,
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub debug: bool,
    pub target: LogTarget,
    pub log_dir: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions { debug: false, target: LogTarget::Stdout, log_dir: String::from("/tmp/ilp-client/logs") }
    }
}

/// Initializes the global `tracing` subscriber exactly once per process,
/// mirroring the teacher's `TracingFactory` (pretty compact formatter,
/// optional rolling daily file). Subsequent calls are no-ops.
pub fn init(options: LogOptions) {
    INIT.call_once(|| {
        let level = if options.debug { Level::DEBUG } else { Level::INFO };
        let format = tracing_subscriber::fmt::format()
            .with_file(true)
            .with_line_number(false)
            .with_target(false)
            .with_thread_ids(true)
            .compact();

        match options.target {
            LogTarget::Stdout => {
                let _ = tracing_subscriber::fmt()
                    .with_max_level(level)
                    .event_format(format)
                    .try_init();
            }
            LogTarget::File => {
                let file_appender = rolling::daily(&options.log_dir, "ilp-client.log");
                let writer = file_appender.and(std::io::stdout);
                let _ = tracing_subscriber::fmt()
                    .with_max_level(level)
                    .event_format(format)
                    .with_writer(writer)
                    .try_init();
            }
        }
    });
}

pub fn init_default(debug: bool) {
    init(LogOptions { debug, ..LogOptions::default() });
}
