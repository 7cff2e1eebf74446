use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::classifier::FileClassifier;
use crate::config::Config;
use crate::criteria;
use crate::error::RolemapError;
use crate::structure::{ProjectStructure, StructureAggregator};
use crate::types::{AnalysisCriteria, AnalysisMode, CriteriaCheckResult};
use crate::walker::{CancelToken, FileWalker};

/// Structure snapshot plus the criteria evaluated against it.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub structure: ProjectStructure,
    pub results: Vec<CriteriaCheckResult>,
}

impl AnalysisOutcome {
    /// True when the run succeeded and every criterion passed.
    pub fn passed(&self) -> bool {
        self.structure.is_valid() && self.results.iter().all(|r| r.passed)
    }
}

/// Walk, classify, aggregate and evaluate, in that order.
pub struct AnalysisPipeline {
    config: Config,
    walker: FileWalker,
    classifier: FileClassifier,
    aggregator: StructureAggregator,
}

impl AnalysisPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let walker = FileWalker::from_config(&config);
        let classifier = FileClassifier::new().context("failed to compile content markers")?;
        let aggregator =
            StructureAggregator::new().context("failed to compile evidence patterns")?;
        Ok(Self {
            config,
            walker,
            classifier,
            aggregator,
        })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze `path` in the configured mode.
    pub fn analyze(&self, path: &str) -> ProjectStructure {
        self.analyze_with(path, self.config.analysis.mode, &CancelToken::new())
    }

    /// Analyze `path`. Run-level failures are reported through the
    /// structure's `error` field, never as a panic or `Err`.
    pub fn analyze_with(
        &self,
        path: &str,
        mode: AnalysisMode,
        cancel: &CancelToken,
    ) -> ProjectStructure {
        let root = match resolve_root(path) {
            Ok(root) => root,
            Err(e) => {
                tracing::error!("analysis of '{path}' failed: {e}");
                return ProjectStructure::failed(path, mode, e.to_string());
            }
        };

        match self.analyze_root(&root, mode, cancel) {
            Ok(structure) => structure,
            Err(e) => {
                tracing::error!("analysis of '{}' failed: {e}", root.display());
                ProjectStructure::failed(root.display().to_string(), mode, e.to_string())
            }
        }
    }

    fn analyze_root(
        &self,
        root: &Path,
        mode: AnalysisMode,
        cancel: &CancelToken,
    ) -> std::result::Result<ProjectStructure, RolemapError> {
        let mut files = self.walker.walk(root, cancel)?;
        tracing::debug!("discovered {} files under {}", files.len(), root.display());

        self.walker.load_contents(root, &mut files, mode, cancel)?;

        for file in &mut files {
            self.classifier.classify(file);
            tracing::debug!(
                "{} -> {} ({:.2})",
                file.path,
                file.role,
                file.confidence
            );
        }

        if cancel.is_cancelled() {
            return Err(RolemapError::Cancelled);
        }

        let structure = self.aggregator.aggregate(root, mode, files, &self.walker);
        tracing::info!(
            "classified {} files under {}: {} controllers, {} data contexts, {} pages",
            structure.total_files(),
            structure.root_path,
            structure.total_controllers(),
            structure.db_contexts.len(),
            structure.pages.len(),
        );
        Ok(structure)
    }

    /// Analyze `path` and evaluate `criteria` against the result.
    pub fn run(
        &self,
        path: &str,
        mode: AnalysisMode,
        criteria: &[AnalysisCriteria],
        cancel: &CancelToken,
    ) -> AnalysisOutcome {
        let structure = self.analyze_with(path, mode, cancel);
        let results = criteria::evaluate_criteria(&structure, criteria, mode);
        AnalysisOutcome { structure, results }
    }
}

/// Validate and absolutize the requested directory.
fn resolve_root(path: &str) -> std::result::Result<PathBuf, RolemapError> {
    if path.trim().is_empty() {
        return Err(RolemapError::EmptyPath);
    }
    let root = Path::new(path)
        .canonicalize()
        .map_err(|_| RolemapError::DirectoryNotFound(path.to_string()))?;
    if !root.is_dir() {
        return Err(RolemapError::DirectoryNotFound(path.to_string()));
    }
    Ok(root)
}
