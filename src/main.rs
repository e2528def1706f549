use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fleetwatch::data::duration::format_age;
use fleetwatch::render::{export_json, render_table};
use fleetwatch::{DurationValue, FileSource, FleetView, Session, Settings, StalenessInput};

/// Shortest loop period; a zero refresh interval would spin.
const MIN_TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "fleetwatch")]
#[command(about = "Fleet-wide server health view")]
struct Args {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the fleet JSON file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Hide servers that have not reported for this long (e.g. "60", "2m", "1h30m")
    #[arg(long)]
    ignore_after: Option<String>,

    /// Recompute interval (e.g. "5", "10s")
    #[arg(short, long)]
    refresh: Option<String>,

    /// Export the current view to a JSON file and exit
    #[arg(short, long, conflicts_with = "once")]
    export: Option<PathBuf>,

    /// Print the view once and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    /// Command-line flags win over the config file and environment.
    fn apply(&self, settings: &mut Settings) {
        if let Some(ref file) = self.file {
            settings.fleet_file = file.clone();
        }
        if let Some(ref expr) = self.ignore_after {
            settings.ignore_after = Some(StalenessInput::from(expr.as_str()));
        }
        if let Some(ref expr) = self.refresh {
            settings.refresh_interval = DurationValue::from(expr.as_str());
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    args.apply(&mut settings);

    init_tracing(&settings.log);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, settings))
}

fn init_tracing(directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Args, settings: Settings) -> Result<()> {
    let refresh = settings
        .refresh_interval()
        .context("Invalid refresh_interval")?;
    let upstream_timeout = settings
        .upstream_timeout()
        .context("Invalid upstream_timeout")?;

    let source = Arc::new(FileSource::new(&settings.fleet_file));
    let view = FleetView::from_source(source)
        .refresh_interval(refresh)
        .staleness(settings.staleness())
        .upstream_timeout(upstream_timeout)
        .build();

    info!(
        "Watching {} (refresh {:?}, staleness {:?})",
        view.description(),
        refresh,
        view.staleness().threshold()
    );

    if let Some(path) = args.export {
        let payload = view.view(Session::Initial).await?;
        export_json(&payload, &path)
            .await
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        println!(
            "Exported {} servers to {}",
            payload.entities.len(),
            path.display()
        );
        return Ok(());
    }

    if args.once {
        let payload = view.view(Session::Initial).await?;
        print!("{}", render_table(&payload, Utc::now()));
        return Ok(());
    }

    watch(&view, refresh).await
}

/// Redraw the table every refresh tick until interrupted.
async fn watch(view: &FleetView, refresh: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(refresh.max(MIN_TICK));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => {
                info!("Interrupted, exiting");
                return Ok(());
            }
        }

        let result = view.view(Session::Initial).await;
        let now = Utc::now();

        if io::stdout().is_terminal() {
            print!("\x1B[2J\x1B[H");
        }

        match result {
            Ok(payload) => print!("{}", render_table(&payload, now)),
            Err(e) => {
                warn!("Recompute failed: {}", e);
                match view.last_good() {
                    Some(payload) => {
                        print!("{}", render_table(&payload, now));
                        println!(
                            "! refresh failed, showing view from {} ago: {}",
                            format_age(payload.age_secs(now)),
                            e
                        );
                    }
                    None => println!("! no view available yet: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "fleetwatch",
            "--file",
            "/srv/fleet.json",
            "--ignore-after",
            "1m",
            "--refresh",
            "30",
        ]);
        let mut settings = Settings::default();

        args.apply(&mut settings);

        assert_eq!(settings.fleet_file, PathBuf::from("/srv/fleet.json"));
        assert_eq!(
            settings.staleness().threshold(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(settings.refresh_interval().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let args = Args::parse_from(["fleetwatch"]);
        let mut settings = Settings::default();

        args.apply(&mut settings);

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_export_conflicts_with_once() {
        let result = Args::try_parse_from(["fleetwatch", "--export", "out.json", "--once"]);
        assert!(result.is_err());
    }
}
