use anyhow::{Context, Result};
use std::sync::Arc;

use stormwatch::config::Config;
use stormwatch::feed::HttpFetcher;
use stormwatch::tracker::{BasinScanner, CycloneRegistry, ScanRequest};

/// Scan the basin once and print what would be tracked
pub async fn scan(config: Config, name: Option<String>, json: bool) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::from_config(&config.http)?);
    let scanner = BasinScanner::new(fetcher, config.feed.clone());
    let registry = CycloneRegistry::new(config.schedule.blacklist_purge_cycles);

    let request = match &name {
        Some(name) => ScanRequest::by_name(name),
        None => ScanRequest::automatic(config.feed.strength_filter()),
    };

    let report = scanner
        .scan(&registry, &request)
        .await
        .context("Basin scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Basin: {}", scanner.basin_url());
    println!("================================");

    if report.nothing_active {
        println!("There are no tropical cyclones in the basin at this time.");
        return Ok(());
    }

    if report.candidates.is_empty() {
        println!("\nNo cyclones qualify for tracking.");
    } else {
        println!("\nWould track {} cyclone(s):\n", report.candidates.len());
        for (i, candidate) in report.candidates.iter().enumerate() {
            println!(
                "{}. {} ({} {})",
                i + 1,
                candidate.atcf,
                candidate.strength,
                stormwatch::utils::capitalize(&candidate.name)
            );
            println!("   Advisory: {}", candidate.advisory_url);
            println!("   Graphic: {}", candidate.image_url);
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped:");
        for entry in &report.skipped {
            println!(
                "  - {}: {}",
                entry.atcf.as_deref().unwrap_or("<no id>"),
                entry.reason
            );
        }
    }

    Ok(())
}
