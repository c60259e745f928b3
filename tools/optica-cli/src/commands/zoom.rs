//! Route a logical zoom value to a lens.

use std::path::PathBuf;

use optica_negotiation::zoom::{compute_weights, route};

use super::load_topology;

pub fn run(topology: PathBuf, logical: f64) -> anyhow::Result<()> {
    let topology = load_topology(&topology)?;
    let weights = compute_weights(&topology.roles(), &topology.crossover)?;

    println!("Crossover: {:?}", topology.crossover.factors());
    println!("Weights:");
    for role in weights.roles() {
        if let Some(weight) = weights.weight(role) {
            println!("  {:<10} {weight:.4}", role.as_str());
        }
    }
    if let Some(threshold) = weights.telephoto_threshold() {
        println!("Telephoto from {threshold:.2}x");
    }

    let route = route(logical, &weights)?;
    let lens = topology
        .lens(route.role)
        .ok_or_else(|| anyhow::anyhow!("Topology has no {} lens", route.role))?;

    println!();
    println!(
        "{logical}x -> {} ({}) at native {:.3}x",
        lens.id, route.role, route.native_factor
    );
    if route.native_factor > lens.max_zoom_factor {
        println!(
            "  exceeds lens maximum of {:.1}x; a session would reject this",
            lens.max_zoom_factor
        );
    }

    Ok(())
}
