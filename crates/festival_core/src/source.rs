use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::curated::CuratedNotification;
use crate::performance::Performance;

/// Supplies the complete current list of performances. A failed fetch yields
/// no snapshot at all, never a partial one.
pub trait PerformanceSource: Send + Sync {
    fn fetch_performances(&self) -> Result<Vec<Performance>>;
}

pub trait CuratedSource: Send + Sync {
    fn fetch_curated(&self) -> Result<Vec<CuratedNotification>>;
}

/// A JSON array of performances on disk, rewritten by an external exporter.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PerformanceSource for SnapshotFile {
    fn fetch_performances(&self) -> Result<Vec<Performance>> {
        let performances: Vec<Performance> = read_json_array(&self.path)?;
        let mut seen = HashSet::new();
        let unique: Vec<Performance> = performances
            .into_iter()
            .filter(|performance| {
                let fresh = seen.insert(performance.id.clone());
                if !fresh {
                    tracing::warn!(id = %performance.id, "duplicate performance id in snapshot");
                }
                fresh
            })
            .collect();
        Ok(unique)
    }
}

/// A JSON array of curated notifications on disk.
#[derive(Debug, Clone)]
pub struct CuratedFeedFile {
    path: PathBuf,
}

impl CuratedFeedFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CuratedSource for CuratedFeedFile {
    fn fetch_curated(&self) -> Result<Vec<CuratedNotification>> {
        read_json_array(&self.path)
    }
}

fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))
}
