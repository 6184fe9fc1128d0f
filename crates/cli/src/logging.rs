use printguard_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

use crate::commands::RuntimeOptions;

/// Installs the global subscriber. Logs go to stderr so stdout stays a single
/// JSON document per command.
pub fn init(options: &RuntimeOptions) {
    // An invalid config is reported by the command itself; log with defaults.
    let logging = options.load_config().unwrap_or_default().logging;
    init_with(&logging);
}

pub fn init_with(logging: &LoggingConfig) {
    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("logging already initialized: {error}");
    }
}
