//! Local persistence of the user's holdings.

pub mod interchange;

use crate::core::holding::{Holding, normalize_symbol};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Deserialize, Serialize)]
struct HoldingsFile {
    #[serde(default)]
    holdings: Vec<Holding>,
}

/// Holdings kept in a YAML file. A missing file reads as no holdings.
pub struct HoldingsStore {
    path: PathBuf,
}

impl HoldingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        HoldingsStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Holding>> {
        if !self.path.exists() {
            debug!("No holdings file at {}", self.path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read holdings file: {}", self.path.display()))?;
        let file: HoldingsFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse holdings file: {}", self.path.display()))?;

        let holdings = file
            .holdings
            .into_iter()
            .enumerate()
            .map(|(index, holding)| {
                let label = format!("#{} ({} {})", index + 1, holding.symbol, holding.id);
                holding.validate().with_context(|| {
                    format!("Invalid holding {label} in {}", self.path.display())
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} holdings", holdings.len());
        Ok(holdings)
    }

    /// Replaces the stored holdings. Written to a sibling file first and
    /// renamed into place so a failed write keeps the previous holdings.
    pub fn save(&self, holdings: &[Holding]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = serde_yaml::to_string(&HoldingsFile {
            holdings: holdings.to_vec(),
        })
        .context("Failed to serialize holdings")?;

        let tmp_path = self.path.with_extension("yaml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write holdings file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace holdings file: {}", self.path.display()))?;
        debug!("Saved {} holdings to {}", holdings.len(), self.path.display());
        Ok(())
    }

    pub fn add(&self, holding: Holding) -> Result<()> {
        let mut holdings = self.load()?;
        holdings.push(holding);
        self.save(&holdings)
    }

    /// Removes holdings whose id or symbol matches `key`. Returns how many
    /// were removed.
    pub fn remove(&self, key: &str) -> Result<usize> {
        let mut holdings = self.load()?;
        let before = holdings.len();
        let symbol = normalize_symbol(key);
        holdings.retain(|h| h.id != key.trim() && h.symbol != symbol);

        let removed = before - holdings.len();
        if removed > 0 {
            self.save(&holdings)?;
        }
        Ok(removed)
    }
}
