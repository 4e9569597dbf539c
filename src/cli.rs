use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "app-dashboard")]
#[command(author = "Anurag Ambuj")]
#[command(version)]
#[command(about = "Live application registry and JVM metrics for registered services", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'c',
        long,
        help = "Path to configuration file",
        env = "APP_DASHBOARD_CONFIG"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'i',
        long,
        help = "Polling interval (e.g. 5s, 15s, 1m)",
        value_parser = parse_duration
    )]
    pub interval: Option<Duration>,

    #[arg(long, help = "Poll once, export a snapshot and exit")]
    pub once: bool,

    #[arg(long, help = "Directory for exported snapshots")]
    pub export_dir: Option<String>,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    match humantime::parse_duration(s) {
        Ok(duration) if duration.is_zero() => Err("interval must be non-zero".to_string()),
        Ok(duration) => Ok(duration),
        Err(e) => Err(e.to_string()),
    }
}
