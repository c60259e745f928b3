pub mod formats;
pub mod select;
pub mod simulate;
pub mod zoom;

use std::path::Path;

use optica_device_model::lens::Topology;

pub(crate) fn load_topology(path: &Path) -> anyhow::Result<Topology> {
    Topology::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load topology {}: {e}", path.display()))
}
