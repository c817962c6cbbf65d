// src/core/engine.rs
use std::path::{Path, PathBuf};
use anyhow::Result;
use tracing::{info, warn, debug};

use crate::config::Config;
use super::{Analysis, Analyzer, FocusPredicate, GraphState, ReportGenerator, SourceCollector};

/// Default configuration file written by `init`
const CONFIG_FILE_NAME: &str = "Callheat.toml";

/// Main orchestration engine: collect, analyze, render
pub struct Engine {
    config: Config,
    collector: SourceCollector,
    analyzer: Analyzer,
    reports: ReportGenerator,
}

impl Engine {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        let collector = SourceCollector::new(&config.parsing, &config.project.ignore_patterns)?;
        let analyzer = Analyzer::new(&config.ranking);
        let reports = ReportGenerator::new(&config.output, &config.project.name)?;

        Ok(Self {
            config,
            collector,
            analyzer,
            reports,
        })
    }

    /// Collect and analyze everything under `path`
    pub async fn analyze(&self, path: &Path, focus: Option<&str>) -> Result<Analysis> {
        // Fail on a bad predicate before touching the file system
        if let Some(raw) = focus {
            FocusPredicate::parse(raw)?;
        }

        info!("🔍 Scanning {}", path.display());
        let collected = self.collector.collect(path).await?;
        info!("Found {} Python files ({} unreadable)", collected.files.len(), collected.failures.len());

        let analysis = self.analyzer.analyze_collected(collected, focus)?;
        if let GraphState::Empty = analysis.graph {
            warn!("⚠️ No functions found under {}", path.display());
        }
        Ok(analysis)
    }

    /// Analyze, print to stdout and optionally export JSON / Markdown
    pub async fn map(
        &self,
        path: PathBuf,
        focus: Option<String>,
        json: Option<PathBuf>,
        markdown: Option<PathBuf>,
    ) -> Result<()> {
        let analysis = self.analyze(&path, focus.as_deref()).await?;

        let rendered = match self.config.output.format.as_str() {
            "json" => self.reports.to_json(&analysis)?,
            "markdown" => self.reports.to_markdown(&analysis)?,
            _ => self.reports.to_summary(&analysis),
        };
        println!("{}", rendered);

        if let Some(json_path) = json {
            write_output(&json_path, &self.reports.to_json(&analysis)?).await?;
            info!("✅ JSON export: {}", json_path.display());
        }
        if let Some(markdown_path) = markdown {
            write_output(&markdown_path, &self.reports.to_markdown(&analysis)?).await?;
            info!("✅ Markdown report: {}", markdown_path.display());
        }

        info!("🎉 Mapped {} functions (fingerprint {})", analysis.diagnostics.entities, short_fingerprint(&analysis));
        Ok(())
    }

    /// Render the Markdown digest to a file or stdout
    pub async fn report(&self, path: PathBuf, focus: Option<String>, output: Option<PathBuf>) -> Result<()> {
        let analysis = self.analyze(&path, focus.as_deref()).await?;
        let markdown = self.reports.to_markdown(&analysis)?;

        match output {
            Some(output_path) => {
                write_output(&output_path, &markdown).await?;
                info!("✅ Markdown report: {}", output_path.display());
            }
            None => println!("{}", markdown),
        }
        Ok(())
    }

    /// Write a default configuration file, leaving an existing one alone
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        info!("Initializing Callheat in: {}", target_dir.display());

        tokio::fs::create_dir_all(&target_dir).await?;
        let config_path = target_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            warn!("{} already exists, leaving it untouched", config_path.display());
            return Ok(());
        }

        let mut config = Config::default();
        if let Some(name) = target_dir.canonicalize()?.file_name() {
            config.project.name = name.to_string_lossy().to_string();
        }
        config.save(&config_path)?;

        info!("✅ Wrote {}", config_path.display());
        Ok(())
    }
}

async fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

fn short_fingerprint(analysis: &Analysis) -> String {
    let fingerprint = analysis.fingerprint();
    if fingerprint.is_empty() {
        "none".to_string()
    } else {
        fingerprint.chars().take(12).collect()
    }
}
