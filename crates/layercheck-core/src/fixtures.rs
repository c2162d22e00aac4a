//! Fixture sources: an explicit list or corpus auto-discovery.

use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{ConfigError, ParityError, Result};
use crate::model::Fixture;

pub const DEFAULT_CORPUS_PATTERN: &str = "**/*.mmd";

pub trait FixtureSource {
    /// Fixtures in deterministic order.
    fn fixtures(&self) -> Result<Vec<Fixture>>;
}

#[derive(Debug, Clone, Default)]
pub struct FixtureList {
    paths: Vec<PathBuf>,
}

impl FixtureList {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl FixtureSource for FixtureList {
    fn fixtures(&self) -> Result<Vec<Fixture>> {
        let mut out = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            if !path.is_file() {
                return Err(ParityError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "fixture file not found"),
                ));
            }
            out.push(Fixture::from_path(path));
        }
        ensure_unique_names(&out)?;
        Ok(out)
    }
}

/// Walks `root` and keeps files whose root-relative path matches `pattern`.
#[derive(Debug, Clone)]
pub struct CorpusDiscovery {
    root: PathBuf,
    matcher: GlobMatcher,
}

impl CorpusDiscovery {
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self, ConfigError> {
        let glob = Glob::new(pattern)
            .map_err(|e| ConfigError(format!("invalid corpus pattern '{pattern}': {e}")))?;
        Ok(Self {
            root: root.into(),
            matcher: glob.compile_matcher(),
        })
    }
}

impl FixtureSource for CorpusDiscovery {
    fn fixtures(&self) -> Result<Vec<Fixture>> {
        let mut files = Vec::new();
        walk(&self.root, &mut files)?;
        let mut out: Vec<Fixture> = files
            .into_iter()
            .filter(|p| {
                p.strip_prefix(&self.root)
                    .map(|rel| self.matcher.is_match(rel))
                    .unwrap_or(false)
            })
            .map(Fixture::from_path)
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        ensure_unique_names(&out)?;
        tracing::info!(
            root = %self.root.display(),
            count = out.len(),
            "discovered fixtures"
        );
        Ok(out)
    }
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| ParityError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ParityError::io(dir, e))?;
        let path = entry.path();
        let ty = entry.file_type().map_err(|e| ParityError::io(&path, e))?;
        if ty.is_dir() {
            walk(&path, out)?;
        } else if ty.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn ensure_unique_names(fixtures: &[Fixture]) -> Result<()> {
    let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
    for f in fixtures {
        if let Some(prev) = seen.insert(&f.name, &f.path) {
            return Err(ParityError::parse(
                &f.name,
                format!(
                    "fixture name is ambiguous: {} and {}",
                    prev.display(),
                    f.path.display()
                ),
            ));
        }
    }
    Ok(())
}
