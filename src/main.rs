// Team manager entry point.
//
// Startup sequence:
// 1. Load config
// 2. Initialize tracing (log to file, not the terminal)
// 3. Open the local cache and load the document (migrated on load)
// 4. Print a per-team roster and results summary
//
// The CLI runs local and anonymous; the hosted collaborators only come into
// play through the library's session layer.

use anyhow::Context;
use tracing::info;

use volley_manager::config::{self, Config};
use volley_manager::db;
use volley_manager::team::stats;

fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("failed to load configuration")?;
    init_tracing(&config)?;
    info!(db_path = %config.db_path.display(), "volley manager starting up");

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path = config.db_path.to_string_lossy().into_owned();
    let cache = db::LocalCache::open(&db_path).context("failed to open the local cache")?;
    let data = cache.load_document();
    info!(teams = data.teams.len(), "document loaded");

    if data.teams.is_empty() {
        println!("Aucune équipe enregistrée.");
        return Ok(());
    }

    for team in &data.teams {
        let marker = if data.current_team_id == Some(team.id) { "*" } else { " " };
        let season = if team.season.is_empty() {
            String::new()
        } else {
            format!(" ({})", team.season)
        };
        let totals = stats::team_stats(team);
        println!("{marker} {}{season}", team.name);
        println!(
            "    {} joueur(s), {} match(s) joué(s) : {} V / {} D, {} pt(s) de classement",
            team.players.len(),
            totals.played,
            totals.won,
            totals.lost,
            totals.ranking_points
        );
        println!(
            "    sets {} / {}, points {} / {}",
            totals.sets_for, totals.sets_against, totals.points_for, totals.points_against
        );
    }

    Ok(())
}

/// Log to a file so the terminal stays free for the summary output.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create {}", config.log_dir.display()))?;
    let log_file = std::fs::File::create(config.log_dir.join("volley-manager.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
