use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CallheatError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Heat blending weights
    pub ranking: RankingConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, used in report headers
    pub name: String,

    /// Extra gitignore-style patterns to exclude from scanning
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,

    /// Directory names that are never descended into
    pub skip_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Weight of normalized betweenness in the heat blend
    pub betweenness_weight: f64,

    /// Weight of normalized in-degree in the heat blend
    pub in_degree_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (summary, json, markdown)
    pub format: String,

    /// Number of rows in the hotspot/fan-in/fan-out tables
    pub hotspot_count: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            betweenness_weight: 0.5,
            in_degree_weight: 0.5,
        }
    }
}

impl RankingConfig {
    /// Weights rescaled to sum to 1. Negative or all-zero weights fall back to the defaults.
    pub fn normalized_weights(&self) -> (f64, f64) {
        let b = self.betweenness_weight;
        let d = self.in_degree_weight;
        if !b.is_finite() || !d.is_finite() || b < 0.0 || d < 0.0 || b + d <= 0.0 {
            let fallback = Self::default();
            return (fallback.betweenness_weight, fallback.in_degree_weight);
        }
        (b / (b + d), d / (b + d))
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024, // 1MB
            skip_dirs: vec![
                "__pycache__".to_string(),
                ".git".to_string(),
                ".venv".to_string(),
                "venv".to_string(),
                "env".to_string(),
                ".mypy_cache".to_string(),
            ],
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed Project".to_string(),
            ignore_patterns: vec![
                "build/".to_string(),
                "dist/".to_string(),
                "*.egg-info/".to_string(),
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "summary".to_string(),
            hotspot_count: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            parsing: ParsingConfig::default(),
            ranking: RankingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CallheatError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CallheatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "Callheat.toml",
                    "callheat.toml",
                    ".callheat.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
