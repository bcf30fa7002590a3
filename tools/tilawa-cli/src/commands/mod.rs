//! CLI subcommands and the tool's segment-list file format.
//!
//! The JSON file format belongs to this tool, not to the engine: the
//! engine takes segment lists and delays as plain inputs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tilawa_project_model::Segment;

pub mod export;
pub mod info;
pub mod probe;

/// Segment-list file: a named selection plus the inter-segment delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_delay")]
    pub delay_between_segments: f64,

    pub segments: Vec<Segment>,
}

fn default_delay() -> f64 {
    1.0
}

impl ProjectFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let file: ProjectFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))?;
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
        Ok(())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("untitled")
    }
}
