use std::borrow::Cow;
use std::io::Write;

use env_logger::{fmt::Color, Builder, Env};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use log::{Level, LevelFilter};
use once_cell::sync::OnceCell;

static INSTANCE: OnceCell<Logger> = OnceCell::new();

/// Environment variable overriding the verbosity-derived filter.
const LOG_ENV_VAR: &str = "NEDRIFT_LOG";

// Indexed by the (saturated) -v count.
const VERBOSITY_FILTERS: [LevelFilter; 5] = [
    LevelFilter::Error,
    LevelFilter::Warn,
    LevelFilter::Info,
    LevelFilter::Debug,
    LevelFilter::Trace,
];

/// Process-wide logging state. The `MultiProgress` multiplexer stays
/// private: the engines obtain progress bars through
/// [`Logger::progress_bar`], which keeps bar redraws and log lines from
/// clobbering each other.
pub struct Logger {
    multi_pg: MultiProgress,
}

impl Logger {

    /// Build and register the global logger.
    ///
    /// `verbosity` is the -v occurrence count (0 = Error .. 4+ = Trace);
    /// the `NEDRIFT_LOG` environment variable takes precedence when set.
    pub fn init(verbosity: u8) {
        let logger = Builder::new()
            .filter_level(Self::filter(verbosity))
            .format(|buf, record| {
                let mut level_style = buf.style();
                let (color, bold) = match record.level() {
                    Level::Error => (Color::Red,    true),
                    Level::Warn  => (Color::Yellow, false),
                    Level::Info  => (Color::Green,  false),
                    Level::Debug => (Color::Blue,   false),
                    Level::Trace => (Color::Cyan,   false),
                };
                level_style.set_color(color).set_bold(bold);

                write!(
                    buf,
                    "[{} {: <5} {}] {}",
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                    level_style.value(record.level()),
                    record.target(),
                    record.args()
                )?;
                // Errors carry their origin, so users can report them as-is.
                if record.level() == Level::Error {
                    write!(buf, " (at {}:{})", record.file().unwrap_or("?"), record.line().unwrap_or(0))?;
                }
                writeln!(buf)
            })
            .parse_env(Env::default().filter(LOG_ENV_VAR))
            .build();

        let multi_pg = MultiProgress::new();
        LogWrapper::new(multi_pg.clone(), logger)
            .try_init()
            .expect("Failed to wrap logger with multiprogress");
        INSTANCE.set(Logger { multi_pg }).unwrap_or_else(|_| panic!("Logger initialized twice"));
    }

    /// A progress bar wired into the logging bridge.
    ///
    /// Before [`Logger::init`] has run (unit tests, library callers) the
    /// returned bar is hidden and every operation on it is a no-op.
    pub fn progress_bar(len: u64, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        let bar = match INSTANCE.get() {
            Some(logger) => logger.multi_pg.add(ProgressBar::new(len)),
            None         => ProgressBar::hidden(),
        };
        bar.set_message(message);
        bar
    }

    fn filter(verbosity: u8) -> LevelFilter {
        VERBOSITY_FILTERS[usize::from(verbosity).min(VERBOSITY_FILTERS.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_filters() {
        assert_eq!(Logger::filter(0), LevelFilter::Error);
        assert_eq!(Logger::filter(1), LevelFilter::Warn);
        assert_eq!(Logger::filter(2), LevelFilter::Info);
        assert_eq!(Logger::filter(3), LevelFilter::Debug);
        assert_eq!(Logger::filter(4), LevelFilter::Trace);
        // Anything past -vvvv saturates at Trace.
        assert_eq!(Logger::filter(u8::MAX), LevelFilter::Trace);
    }

    #[test]
    fn progress_bars_hide_without_a_logger() {
        let bar = Logger::progress_bar(10, "locus pairs");
        assert!(bar.is_hidden());
        bar.inc(3);
        bar.finish_and_clear();
    }
}
