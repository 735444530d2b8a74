use crate::hit::{DEFAULT_COLUMNS, DEFAULT_ROWS};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub columns: usize,
    pub rows: usize,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub width: f64,
    pub height: f64,
    pub pad_diameter: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 120.0,
            pad_diameter: 25.0,
        }
    }
}

impl NodeConfig {
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn pad_size(&self) -> (f64, f64) {
        (self.pad_diameter, self.pad_diameter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub position_quantum: f64,
    pub link_on_release: bool,
}

impl InteractionConfig {
    /// The drag grid size, falling back to the default when
    /// `position_quantum` is not a positive finite number.
    pub fn quantum(&self) -> f64 {
        if self.position_quantum.is_finite() && self.position_quantum > 0.0 {
            self.position_quantum
        } else {
            Self::default().position_quantum
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            position_quantum: 16.0,
            link_on_release: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub area: AreaConfig,
    pub node: NodeConfig,
    pub interaction: InteractionConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AreaConfigFile {
    columns: Option<usize>,
    rows: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NodeConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    pad_diameter: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct InteractionConfigFile {
    position_quantum: Option<f64>,
    link_on_release: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    area: Option<AreaConfigFile>,
    node: Option<NodeConfigFile>,
    interaction: Option<InteractionConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlays a JSON config file onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(area) = parsed.area {
        if let Some(v) = area.columns {
            config.area.columns = v.max(1);
        }
        if let Some(v) = area.rows {
            config.area.rows = v.max(1);
        }
    }

    if let Some(node) = parsed.node {
        if let Some(v) = node.width {
            config.node.width = v;
        }
        if let Some(v) = node.height {
            config.node.height = v;
        }
        if let Some(v) = node.pad_diameter {
            config.node.pad_diameter = v;
        }
    }

    if let Some(interaction) = parsed.interaction {
        if let Some(v) = interaction.position_quantum {
            if !(v.is_finite() && v > 0.0) {
                bail!("positionQuantum must be a positive number, got {v}");
            }
            config.interaction.position_quantum = v;
        }
        if let Some(v) = interaction.link_on_release {
            config.interaction.link_on_release = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).expect("defaults");
        assert_eq!(config, Config::default());
        assert_eq!(config.area.columns, 32);
        assert_eq!(config.area.rows, 24);
        assert_eq!(config.node.size(), (200.0, 120.0));
        assert_eq!(config.interaction.position_quantum, 16.0);
    }

    #[test]
    fn overlays_only_present_fields() {
        let config = parse_config(
            r#"{ "area": { "columns": 8 }, "node": { "padDiameter": 10 },
                 "interaction": { "linkOnRelease": false } }"#,
        )
        .expect("valid config");
        assert_eq!(config.area.columns, 8);
        assert_eq!(config.area.rows, 24);
        assert_eq!(config.node.pad_size(), (10.0, 10.0));
        assert_eq!(config.node.width, 200.0);
        assert!(!config.interaction.link_on_release);
    }

    #[test]
    fn zero_cells_are_clamped() {
        let config = parse_config(r#"{ "area": { "columns": 0, "rows": 0 } }"#).expect("valid config");
        assert_eq!(config.area.columns, 1);
        assert_eq!(config.area.rows, 1);
    }

    #[test]
    fn non_positive_quantum_is_rejected() {
        for quantum in ["0", "-4", "-0.5"] {
            let contents = format!(r#"{{ "interaction": {{ "positionQuantum": {quantum} }} }}"#);
            let err = parse_config(&contents).err().expect("quantum rejected");
            assert!(err.to_string().contains("positionQuantum"), "{quantum}: {err}");
        }
        let config = parse_config(r#"{ "interaction": { "positionQuantum": 0.5 } }"#).expect("valid config");
        assert_eq!(config.interaction.quantum(), 0.5);
    }

    #[test]
    fn unusable_quantum_falls_back_to_default() {
        let mut interaction = InteractionConfig::default();
        for quantum in [0.0, -16.0, f64::NAN, f64::INFINITY] {
            interaction.position_quantum = quantum;
            assert_eq!(interaction.quantum(), 16.0);
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_config("{ area: ").is_err());
    }

    #[test]
    fn reads_from_disk() {
        let path = std::env::temp_dir().join(format!("flowkit-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "interaction": { "positionQuantum": 8 } }"#).expect("write temp config");
        let config = load_config(Some(&path));
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.expect("config").interaction.position_quantum, 8.0);
    }
}
