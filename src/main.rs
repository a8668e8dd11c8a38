mod config;
mod db;
mod error;
mod extractor;
mod fetcher;
mod ranking;
mod sync;
#[cfg(test)]
mod test_support;
mod types;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Args, Config};
use crate::db::Backend;
use crate::error::Result;
use crate::extractor::{extract_series, ExtractStats};
use crate::fetcher::HistoryFetcher;
use crate::ranking::{season_standings, SeasonStandings};
use crate::sync::{SyncStats, Synchronizer};
use crate::types::DerivedRecord;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_level))
        .init();

    let cfg = match Config::load(args) {
        Ok(c) => c,
        Err(e) => {
            error!("Config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let fetcher = HistoryFetcher::new(&cfg.history_base_url)?;

    let backend = if cfg.dry_run {
        info!("Dry run: remote table will not be read or written");
        None
    } else {
        let backend = Backend::connect(&cfg).await?;
        info!("Remote table backend: {}", backend.describe());
        Some(backend)
    };

    let mut all_results: BTreeMap<String, Vec<DerivedRecord>> = BTreeMap::new();
    let mut totals = SyncStats::default();

    // Users are processed strictly one after another.
    for user in &cfg.users {
        info!(user = %user, "Fetching data for {user}...");
        let history = fetcher.fetch_history(user).await?;

        let window = cfg.window_for(user);
        let (records, stats) = extract_series(&history, &window, &cfg.series)?;
        log_extract(user, &window.start, &window.end, &stats);

        if let Some(backend) = &backend {
            info!(user = %user, "Uploading ABC data for {user}...");
            let synced = Synchronizer::new(backend).sync_user(user, &records).await?;
            info!(
                user = %user,
                inserted = synced.inserted,
                updated = synced.updated,
                unchanged = synced.unchanged,
                "Sync complete for {user}: +{} inserted, ~{} updated, {} unchanged",
                synced.inserted,
                synced.updated,
                synced.unchanged,
            );
            totals.absorb(synced);
        }

        all_results.insert(user.clone(), records);
    }

    let standings = season_standings(&all_results);
    log_standings(&standings);

    if let Some(path) = &cfg.dump {
        write_dump(path, &all_results, &standings)?;
        info!("Data saved to {}", path.display());
    }

    let emitted: usize = all_results.values().map(Vec::len).sum();
    info!(
        users = cfg.users.len(),
        records = emitted,
        inserted = totals.inserted,
        updated = totals.updated,
        unchanged = totals.unchanged,
        "Run complete: {} users, {emitted} records, {} remote writes",
        cfg.users.len(),
        totals.writes(),
    );

    Ok(())
}

fn log_extract(user: &str, start: &str, end: &str, stats: &ExtractStats) {
    info!(
        user = %user,
        total = stats.total,
        emitted = stats.emitted,
        "[FILTER] {user}: {} of {} contests kept (period {start}-{end}); rejected: unrated={} period={} series={}",
        stats.emitted,
        stats.total,
        stats.rejected_unrated,
        stats.rejected_window,
        stats.rejected_series,
    );
}

#[derive(Serialize)]
struct RunDump<'a> {
    contest_results: &'a BTreeMap<String, Vec<DerivedRecord>>,
    season_results: &'a [SeasonStandings],
}

fn write_dump(
    path: &Path,
    contest_results: &BTreeMap<String, Vec<DerivedRecord>>,
    season_results: &[SeasonStandings],
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(
        &mut writer,
        &RunDump {
            contest_results,
            season_results,
        },
    )?;
    writer.flush()?;
    Ok(())
}

fn log_standings(standings: &[SeasonStandings]) {
    for season in standings {
        let Some(leader) = season.results.first() else {
            continue;
        };
        info!(
            season = %season.season,
            users = season.results.len(),
            leader = %leader.user,
            total_gp = leader.total_gp,
            "[GP] {}: {} ranked, leader {} with {} GP",
            season.season,
            season.results.len(),
            leader.user,
            leader.total_gp,
        );
        for (rank, r) in season.results.iter().enumerate() {
            debug!(
                "[GP] {} #{} {} | total {} | rank {} | update {} (+{}) | rating {} | highest {}",
                season.season,
                rank + 1,
                r.user,
                r.total_gp,
                r.place_gp,
                r.update_gp,
                r.update_highest,
                r.final_rating,
                r.final_highest,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CapturedLogs;
    use crate::types::Season;

    #[test]
    fn filter_summary_is_logged() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let stats = ExtractStats {
            total: 5,
            rejected_unrated: 1,
            rejected_window: 1,
            rejected_series: 1,
            emitted: 2,
        };
        log_extract("alice", "202304", "202503", &stats);

        let out = logs.contents();
        assert!(out.contains("[FILTER] alice: 2 of 5 contests kept"), "{out}");
        assert!(out.contains("unrated=1 period=1 series=1"), "{out}");
    }

    #[test]
    fn dump_contains_contests_and_standings() {
        let mut all = BTreeMap::new();
        all.insert(
            "alice".to_string(),
            vec![DerivedRecord {
                abc: 352,
                general_place: 900,
                old_rating: Some(1000),
                new_rating: 1040,
                highest: 1040,
                performance: 1300,
                season: Season::Spring(2024),
                update_highest: 40,
            }],
        );
        let standings = season_standings(&all);

        let path = std::env::temp_dir().join(format!("contest-sync-dump-{}.json", std::process::id()));
        write_dump(&path, &all, &standings).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(written["contest_results"]["alice"][0]["abc"], 352);
        assert_eq!(written["contest_results"]["alice"][0]["season"], "2024spring");
        let top = &written["season_results"][0]["results"][0];
        assert_eq!(top["user"], "alice");
        assert_eq!(top["place_gp"], 20);
        assert_eq!(top["update_gp"], 10);
        assert_eq!(top["total_gp"], 30);
    }
}
