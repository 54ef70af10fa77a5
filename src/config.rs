use std::path::Path;

use anyhow::{bail, Context as _};

use crate::simulation::simulator::SimConfig;

/// Loads a `SimConfig` from a `.json`, `.yaml`, or `.yml` file, dispatching
/// on the extension. The loaded value is validated before it is returned.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<SimConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let cfg: SimConfig = match extension.as_deref() {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON config {}", path.display()))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
            .with_context(|| format!("invalid YAML config {}", path.display()))?,
        _ => bail!(
            "unsupported config format {} (use .json or .yaml)",
            path.display()
        ),
    };
    cfg.validate()?;
    Ok(cfg)
}
