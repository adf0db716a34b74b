use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Export-run settings shared by every material compiled in one run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// Mark opaque materials two-sided unless they cull backfaces.
    pub always_two_sided: bool,
    /// Width and height of the shared curve lookup atlas.
    pub curve_atlas_size: u32,
    /// Flip V when texture coordinates are queried and flip it back right
    /// before sampling, which matches the source tool's UV origin.
    pub flip_uv_y: bool,
}

pub const DEFAULT_CURVE_ATLAS_SIZE: u32 = 1024;

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            always_two_sided: false,
            curve_atlas_size: DEFAULT_CURVE_ATLAS_SIZE,
            flip_uv_y: true,
        }
    }
}

impl ExportConfig {
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config json at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config json in {}", path.display()))
    }
}
