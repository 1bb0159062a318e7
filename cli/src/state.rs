//! The JSON file a `daoctl` deployment lives in between invocations

use anyhow::{Context, Result};
use dao_runtime::Runtime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Runtime> {
        let json = fs::read_to_string(&self.path).with_context(|| {
            format!(
                "cannot read {} (run `daoctl init` first)",
                self.path.display()
            )
        })?;
        let runtime = Runtime::from_json(&json)
            .with_context(|| format!("corrupt state file {}", self.path.display()))?;
        debug!(path = %self.path.display(), block = runtime.block(), "state loaded");
        Ok(runtime)
    }

    /// Replaces the file atomically through a sibling temp file
    pub fn save(&self, runtime: &Runtime) -> Result<()> {
        let json = runtime.to_json()?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).with_context(|| format!("cannot write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("cannot replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), block = runtime.block(), "state saved");
        Ok(())
    }
}
