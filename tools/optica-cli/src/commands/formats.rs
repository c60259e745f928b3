//! Show the ranked format catalog of every lens.

use std::path::PathBuf;

use optica_common::config::AppConfig;
use optica_negotiation::ranking::FormatRanker;
use optica_negotiation::scoring::{FormatScorer, ScoredFormat};

use super::load_topology;

pub fn run(config: &AppConfig, topology: PathBuf, enhanced: bool, json: bool) -> anyhow::Result<()> {
    let topology = load_topology(&topology)?;
    let ranker = FormatRanker::new(FormatScorer::new(config.scoring.frame_rate_policy));

    let mut catalogs: Vec<(String, Vec<ScoredFormat>)> = Vec::new();
    for lens in &topology.lenses {
        match ranker.rank_lens(lens, enhanced) {
            Ok(ranked) => catalogs.push((lens.id.to_string(), ranked)),
            Err(e) => tracing::warn!(lens = %lens.id, error = %e, "Skipping lens"),
        }
    }

    if json {
        let value: serde_json::Map<String, serde_json::Value> = catalogs
            .into_iter()
            .map(|(lens, ranked)| serde_json::to_value(ranked).map(|value| (lens, value)))
            .collect::<Result<_, serde_json::Error>>()?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "Topology: {} ({} lenses, policy {:?})",
        topology.name,
        topology.lenses.len(),
        config.scoring.frame_rate_policy
    );
    for (lens, ranked) in &catalogs {
        println!();
        println!("{lens}:");
        println!(
            "  {:>4} {:>3}  {:>8}  {:>3} {:>3} {:>3} {:>3} {:>3}  format",
            "rank", "idx", "score", "dim", "bin", "fps", "sub", "foc"
        );
        for (rank, scored) in ranked.iter().enumerate() {
            println!(
                "  {:>4} {:>3}  {:>8}  {:>3} {:>3} {:>3} {:>3} {:>3}  {}",
                rank + 1,
                scored.index,
                scored.score,
                scored.dimension_score,
                scored.binned_score,
                scored.frame_rate_score,
                scored.subtype_score,
                scored.focus_score,
                scored.format
            );
        }
    }

    Ok(())
}
