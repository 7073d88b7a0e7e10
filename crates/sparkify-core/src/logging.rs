//! Log setup: `env_logger` filtering, routed through indicatif when on a TTY

use indicatif::MultiProgress;

/// Padded level label, optionally wrapped in an ANSI color.
fn level_label(level: log::Level, color: bool) -> String {
    let (label, ansi) = match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    };
    if color {
        format!("{ansi}{label}\x1b[0m")
    } else {
        label.to_string()
    }
}

/// Logger that suspends spinners while printing a line.
pub struct ProgressLogger {
    filter: env_logger::Logger,
    multi: MultiProgress,
}

impl ProgressLogger {
    pub fn new(filter: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { filter, multi }
    }
}

impl log::Log for ProgressLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.filter.matches(record) {
            return;
        }
        let label = level_label(record.level(), true);
        // multi-line messages (table previews) keep their own layout
        let line = format!("[{label}] {}", record.args());
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.filter.flush();
    }
}

/// Default filter for the given verbosity; `RUST_LOG` still wins.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Install the global logger.
///
/// With `multi`, log lines are printed above the progress bars. Without it
/// (non-TTY), plain uncolored lines are written for log collectors.
pub fn init_logging(
    debug: bool,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_filter(debug));

    match multi {
        Some(multi) => {
            let filter = env_logger::Builder::from_env(env).build();
            let max_level = filter.filter();
            log::set_boxed_logger(Box::new(ProgressLogger::new(filter, multi.clone())))?;
            log::set_max_level(max_level);
            Ok(())
        }
        None => env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{}] {}",
                    level_label(record.level(), false),
                    record.args()
                )
            })
            .try_init(),
    }
}
