use serde::{Deserialize, Serialize};

/// Knobs for the mapper and emitter. Every field has a default, so a JSON
/// config only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Files named in `#include` lines at the top of the output
    pub includes: Vec<String>,
    /// Form margins, as `left x top x right x bottom`
    pub margins: String,
    /// Font family for text-bearing widgets
    pub font_family: String,
    /// Write the generator and source comments
    pub header: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            includes: vec!["colors.yml".to_string(), "widgets.yml".to_string()],
            margins: "10x0x10x10".to_string(),
            font_family: "Liberation Sans".to_string(),
            header: true,
        }
    }
}
