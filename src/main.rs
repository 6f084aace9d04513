use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use cfb_dataset::api::{CfbdClient, Offline, RemoteData};
use cfb_dataset::config::Settings;
use cfb_dataset::pipeline;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut settings = Settings::from_env().context("load settings")?;
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    settings.apply_args(&args)?;

    let client;
    let source: &dyn RemoteData = if settings.offline {
        &Offline
    } else {
        client = CfbdClient::new(
            settings.require_api_key()?,
            settings.season_type.clone(),
            settings.conference.clone(),
        )?;
        &client
    };

    let summary = pipeline::run(&settings, source)?;

    println!("Dataset build complete");
    println!("Started:  {}", summary.started_at);
    println!("Finished: {}", summary.finished_at);
    println!(
        "Seasons: {} (fetched {}, cached {}, replaced {})",
        summary.seasons,
        summary.stats.seasons_fetched,
        summary.stats.seasons_cached,
        summary.seasons_replaced
    );
    println!("Stat requests: {}", summary.stats.requests);
    if let Some(teams) = summary.teams {
        println!("Teams: {teams}");
    }
    if let Some(rows) = summary.games_rows {
        println!("Games: {rows}");
    }
    println!(
        "Game stats: {} rows x {} columns",
        summary.stats.rows, summary.stats_columns
    );
    if let Some(rows) = summary.recruiting_rows {
        println!("Recruiting rows: {rows}");
    }
    println!(
        "Efficiency: converted={} absent={} unrecognized={}{}",
        summary.normalize.converted,
        summary.normalize.absent,
        summary.normalize.unrecognized,
        if summary.normalize.patched { " (legacy patch applied)" } else { "" }
    );
    if !summary.normalize.missing_columns.is_empty() {
        println!("Missing efficiency columns: {}", summary.normalize.missing_columns.join(", "));
    }
    for path in &summary.outputs {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
