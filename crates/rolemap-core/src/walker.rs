use std::path::{Component, Path};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::classifier::PAGE_EXTENSIONS;
use crate::config::Config;
use crate::error::{Result, RolemapError};
use crate::types::{AnalysisMode, ContentStatus, ProjectFile};

/// Shared flag a caller flips to abort a long scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Enumerates candidate files under a project root and loads their text.
pub struct FileWalker {
    extensions: Vec<String>,
    exclude: GlobSet,
    max_content_bytes: u64,
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!("ignoring invalid exclude pattern '{pattern}': {e}"),
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Lowercase and dot-prefix an extension (`CS` -> `.cs`).
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// Whether a file with this extension has its content read under `mode`.
pub fn needs_content(extension: &str, mode: AnalysisMode) -> bool {
    mode == AnalysisMode::FullContent || PAGE_EXTENSIONS.contains(&extension)
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl FileWalker {
    pub fn new(extensions: &[String], exclude_patterns: &[String], max_content_bytes: u64) -> Self {
        Self {
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            exclude: build_globset(exclude_patterns),
            max_content_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.project.extensions,
            &config.project.exclude_patterns,
            config.analysis.max_content_bytes,
        )
    }

    pub fn max_content_bytes(&self) -> u64 {
        self.max_content_bytes
    }

    /// Discover every allowed file under `root`, in a stable order.
    ///
    /// Entries that vanish or cannot be inspected mid-walk are skipped.
    pub fn walk(&self, root: &Path, cancel: &CancelToken) -> Result<Vec<ProjectFile>> {
        if !root.is_dir() {
            return Err(RolemapError::DirectoryNotFound(root.display().to_string()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            if cancel.is_cancelled() {
                return Err(RolemapError::Cancelled);
            }
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(extension) = path
                .extension()
                .map(|ext| normalize_extension(&ext.to_string_lossy()))
            else {
                continue;
            };
            if !self.extensions.contains(&extension) {
                continue;
            }

            let rel = path.strip_prefix(root).unwrap_or(path);
            let rel_path = to_slash_path(rel);
            if self.exclude.is_match(&rel_path) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    tracing::debug!("skipping {rel_path}: {e}");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let directory = rel.parent().map(to_slash_path).unwrap_or_default();
            files.push(ProjectFile::new(rel_path, name, extension, size, directory));
        }

        Ok(files)
    }

    /// Read content for every file that `mode` asks for. Each file owns its
    /// slot, so the parallel reads do not affect ordering.
    pub fn load_contents(
        &self,
        root: &Path,
        files: &mut [ProjectFile],
        mode: AnalysisMode,
        cancel: &CancelToken,
    ) -> Result<()> {
        files.par_iter_mut().for_each(|file| {
            if cancel.is_cancelled() || !needs_content(&file.extension, mode) {
                return;
            }
            let (content, status) = self.read_content(&root.join(&file.path), file.size);
            if status.is_degraded() {
                tracing::warn!("content of {} not inspected: {:?}", file.path, status);
            }
            file.content = content;
            file.content_status = status;
        });

        if cancel.is_cancelled() {
            return Err(RolemapError::Cancelled);
        }
        Ok(())
    }

    /// Read one file's text, bounded by the size limit.
    pub fn read_content(&self, path: &Path, size: u64) -> (Option<String>, ContentStatus) {
        if size > self.max_content_bytes {
            return (None, ContentStatus::TooLarge);
        }
        match std::fs::read(path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    let text = match text.strip_prefix('\u{feff}') {
                        Some(stripped) => stripped.to_string(),
                        None => text,
                    };
                    (Some(text), ContentStatus::Loaded)
                }
                Err(_) => (None, ContentStatus::NotUtf8),
            },
            Err(e) => (None, ContentStatus::Unreadable(e.to_string())),
        }
    }
}
