use std::path::Path;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ParsingConfig;
use crate::error::{CallheatError, Result};
use super::extractor::FileExtraction;
use super::languages::{LanguageParser, PythonParser};

/// One source file handed to the analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the scanned root, `/`-separated
    pub path: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A file that was scanned but produced no entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
}

impl ParseFailure {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn from_error(path: &str, error: &CallheatError) -> Self {
        match error {
            CallheatError::Parse { line, column, message, .. } => Self {
                path: path.to_string(),
                line: Some(*line),
                column: Some(*column),
                message: message.clone(),
            },
            other => Self::new(path, other.to_string()),
        }
    }
}

/// Files gathered from disk plus those that could not be read
#[derive(Debug, Clone, Default)]
pub struct CollectedSources {
    pub files: Vec<SourceFile>,
    pub failures: Vec<ParseFailure>,
}

impl CollectedSources {
    pub fn scanned(&self) -> usize {
        self.files.len() + self.failures.len()
    }
}

/// Walks a project and reads the files the language parsers understand
pub struct SourceCollector {
    config: ParsingConfig,
    ignore_patterns: Vec<String>,
    extensions: Vec<String>,
}

impl SourceCollector {
    pub fn new(config: &ParsingConfig, ignore_patterns: &[String]) -> Result<Self> {
        let python_parser = PythonParser::new()?;
        let extensions = python_parser
            .file_extensions()
            .iter()
            .map(|ext| ext.to_string())
            .collect::<Vec<_>>();
        debug!("Collecting {} sources with extensions {:?}", python_parser.language_name(), extensions);

        Ok(Self {
            config: config.clone(),
            ignore_patterns: ignore_patterns.to_vec(),
            extensions,
        })
    }

    /// Collect every parseable file under `root` (or `root` itself if it is a file)
    pub async fn collect<P: AsRef<Path>>(&self, root: P) -> Result<CollectedSources> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(CallheatError::FileSystem(format!(
                "{} does not exist",
                root.display()
            )));
        }

        let mut collected = CollectedSources::default();

        if root.is_file() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| root.display().to_string());
            self.read_into(root, name, &mut collected).await;
            return Ok(collected);
        }

        let mut overrides = OverrideBuilder::new(root);
        for pattern in &self.ignore_patterns {
            overrides
                .add(&format!("!{}", pattern))
                .map_err(|e| CallheatError::Config(format!("Bad ignore pattern {}: {}", pattern, e)))?;
        }
        let overrides = overrides
            .build()
            .map_err(|e| CallheatError::Config(e.to_string()))?;

        let skip_dirs = self.config.skip_dirs.clone();
        // Use ignore crate to respect .gitignore and custom patterns
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .overrides(overrides)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map_or(false, |t| t.is_dir());
                !(is_dir && skip_dirs.iter().any(|d| entry.file_name() == d.as_str()))
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if path.is_file() && self.should_parse_file(path) {
                let relative = path
                    .strip_prefix(root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .replace('\\', "/");
                self.read_into(path, relative, &mut collected).await;
            }
        }

        collected.files.sort_by(|a, b| a.path.cmp(&b.path));
        collected.failures.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(
            "Collected {} files ({} unreadable) under {}",
            collected.files.len(),
            collected.failures.len(),
            root.display()
        );
        Ok(collected)
    }

    /// Read one file, recording a failure instead of aborting the run
    async fn read_into(&self, path: &Path, relative: String, collected: &mut CollectedSources) {
        let size = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata.len() as usize,
            Err(e) => {
                collected.failures.push(ParseFailure::new(relative, e.to_string()));
                return;
            }
        };
        if size > self.config.max_file_size {
            warn!("{} exceeds maximum size limit, skipping", relative);
            collected.failures.push(ParseFailure::new(
                relative,
                format!("file exceeds maximum size of {} bytes", self.config.max_file_size),
            ));
            return;
        }

        match tokio::fs::read(path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => collected.files.push(SourceFile::new(relative, text)),
                Err(_) => collected
                    .failures
                    .push(ParseFailure::new(relative, "file is not valid UTF-8")),
            },
            Err(e) => collected.failures.push(ParseFailure::new(relative, e.to_string())),
        }
    }

    /// Determine if a file should be parsed based on its extension
    fn should_parse_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| self.extensions.iter().any(|known| known == ext))
    }
}

/// Parse and extract every file in parallel.
///
/// Each worker owns its own tree-sitter parser; results come back in input
/// order, one per source.
pub fn extract_sources(sources: &[SourceFile]) -> Vec<std::result::Result<FileExtraction, ParseFailure>> {
    sources
        .par_iter()
        .map_init(PythonParser::new, |parser, source| match parser {
            Ok(parser) => parser
                .extract(source)
                .map_err(|e| ParseFailure::from_error(&source.path, &e)),
            Err(e) => Err(ParseFailure::new(source.path.clone(), e.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sources_keeps_input_order_and_isolates_failures() {
        let sources = vec![
            SourceFile::new("a.py", "def a():\n    b()\n"),
            SourceFile::new("broken.py", "def oops(:\n"),
            SourceFile::new("b.py", "def b():\n    pass\n"),
        ];

        let outcomes = extract_sources(&sources);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().unwrap().entities.len(), 1);
        assert_eq!(outcomes[0].as_ref().unwrap().calls.len(), 1);

        let failure = outcomes[1].as_ref().unwrap_err();
        assert_eq!(failure.path, "broken.py");
        assert!(failure.line.is_some());

        assert_eq!(outcomes[2].as_ref().unwrap().source_file, "b.py");
    }

    #[test]
    fn test_deeply_nested_broken_file_fails_alone() {
        let depth = 50_000;
        let sources = vec![
            SourceFile::new("good.py", "def good():\n    pass\n"),
            SourceFile::new(
                "deep.py",
                format!("def bad():\n    x = {}1 +{}", "(".repeat(depth), ")".repeat(depth)),
            ),
        ];

        let outcomes = extract_sources(&sources);
        assert_eq!(outcomes[0].as_ref().unwrap().entities.len(), 1);
        assert_eq!(outcomes[1].as_ref().unwrap_err().path, "deep.py");
    }

    #[test]
    fn test_parse_failure_from_other_errors() {
        let failure = ParseFailure::from_error("x.py", &CallheatError::FileSystem("gone".to_string()));
        assert_eq!(failure.line, None);
        assert!(failure.message.contains("gone"));
    }

    #[tokio::test]
    async fn test_collect_single_file_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("solo.py");
        std::fs::write(&file, "def solo():\n    pass\n").unwrap();

        let parser = SourceCollector::new(&ParsingConfig::default(), &[]).unwrap();
        let collected = parser.collect(&file).await.unwrap();
        assert_eq!(collected.files.len(), 1);
        assert_eq!(collected.files[0].path, "solo.py");
    }

    #[tokio::test]
    async fn test_collect_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let parser = SourceCollector::new(&ParsingConfig::default(), &[]).unwrap();
        let result = parser.collect(dir.path().join("nowhere")).await;
        assert!(matches!(result, Err(CallheatError::FileSystem(_))));
    }
}
