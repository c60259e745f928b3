//! Select a format for a target on one lens.

use std::path::PathBuf;

use optica_common::config::AppConfig;
use optica_device_model::format::Dimensions;
use optica_device_model::lens::LensRole;
use optica_negotiation::ranking::FormatRanker;
use optica_negotiation::scoring::FormatScorer;
use optica_negotiation::selection::select;

use super::load_topology;

fn parse_role(name: &str) -> anyhow::Result<LensRole> {
    LensRole::ALL
        .into_iter()
        .find(|role| role.as_str() == name)
        .ok_or_else(|| anyhow::anyhow!("Unknown lens role '{name}' (expected ultra-wide, wide or telephoto)"))
}

pub fn run(
    config: &AppConfig,
    topology: PathBuf,
    lens: &str,
    width: u32,
    height: u32,
    fps: f64,
    enhanced: bool,
) -> anyhow::Result<()> {
    let topology = load_topology(&topology)?;
    let role = parse_role(lens)?;
    let lens = topology
        .lens(role)
        .ok_or_else(|| anyhow::anyhow!("Topology has no {role} lens"))?;

    let ranker = FormatRanker::new(FormatScorer::new(config.scoring.frame_rate_policy));
    let ranked = ranker.rank_lens(lens, enhanced)?;
    let target = Dimensions::new(width, height);
    let selection = select(&ranked, target, fps)?;

    println!("Lens: {} ({role})", lens.id);
    println!("Target: {target} @ {fps} fps");
    println!("Selected: {}", selection.format());
    println!("  catalog index: {}", selection.scored().index);
    println!("  score: {}", selection.scored().score);

    match selection.into_parts() {
        (_, Some(warning)) => println!("  degraded: {warning}"),
        (_, None) => println!("  matches target"),
    }

    Ok(())
}
