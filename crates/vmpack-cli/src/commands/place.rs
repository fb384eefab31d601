use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing::info;
use vmpack_placement::{PlacementRequest, PlacementResponse, PlacementStats, ScoringWeights};

pub fn place(input: Option<&Path>, config: Option<&Path>, compact: bool) -> anyhow::Result<()> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading request from stdin")?;
            buf
        }
    };

    let weights = match config {
        Some(path) => ScoringWeights::from_file(path)?,
        None => ScoringWeights::default(),
    };

    let (response, stats) = place_str(&content, &weights)?;
    log_stats(&stats);

    let output = if compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{output}");
    Ok(())
}

pub fn place_str(
    content: &str,
    weights: &ScoringWeights,
) -> anyhow::Result<(PlacementResponse, PlacementStats)> {
    let request = PlacementRequest::from_json(content)?;
    Ok(vmpack_placement::run(request, weights)?)
}

fn log_stats(stats: &PlacementStats) {
    info!(
        average_utilization = stats.average_utilization,
        hosts_used = stats.hosts_used,
        "utilization"
    );
    if let Some(efficiency) = stats.efficiency {
        info!(efficiency, "placement score at average utilization");
    }
    info!(
        migrations = stats.migration_count,
        migration_cost = stats.migration_cost,
        "migrations"
    );
}
