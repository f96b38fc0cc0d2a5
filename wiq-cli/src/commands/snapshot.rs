//! `wiq snapshot` — show the regular files in a working directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

/// Arguments for `wiq snapshot`.
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Directory to list (defaults to the current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Print JSON instead of one name per line.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SnapshotView {
    root: String,
    files: Vec<String>,
}

impl SnapshotArgs {
    pub fn run(self) -> Result<()> {
        let snapshot = wiq_artifacts::snapshot(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?;

        let mut files: Vec<String> = snapshot
            .files()
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        files.sort_unstable();

        if self.json {
            let view = SnapshotView {
                root: snapshot.root().display().to_string(),
                files,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&view).context("failed to render snapshot JSON")?
            );
        } else {
            for file in files {
                println!("{file}");
            }
        }
        Ok(())
    }
}
