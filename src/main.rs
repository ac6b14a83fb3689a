use env_logger::{Builder, WriteStyle};
use log::error;
use njord::config::AppConfig;
use tokio::io::{stdin, BufReader};

fn main() -> anyhow::Result<()> {
    // Logging is configured from the file, so it cannot report load errors yet
    let config = AppConfig::new().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        AppConfig::default()
    });

    Builder::new()
        .filter_level(config.get_log_level())
        .write_style(WriteStyle::Always)
        .format_timestamp_secs()
        .init();

    if let Err(e) = njord::serve(config, BufReader::new(stdin()), tokio::signal::ctrl_c()) {
        error!("Application error: {}", e);
        return Err(e);
    }
    Ok(())
}
