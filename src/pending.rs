use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Per-list pending files: `<dir>/<list>.txt` holds one queued URL per line,
/// `<dir>/<list>.failed` keeps URLs that could not be resolved.
#[derive(Debug, Clone)]
pub struct PendingFiles {
    dir: PathBuf,
}

impl PendingFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_for(&self, list_name: &str) -> PathBuf { self.dir.join(format!("{list_name}.txt")) }

    pub fn failed_path_for(&self, list_name: &str) -> PathBuf { self.dir.join(format!("{list_name}.failed")) }

    /// Non-blank lines, trimmed. A missing file reads as empty.
    pub async fn read(&self, list_name: &str) -> Result<Vec<String>> {
        read_lines(&self.path_for(list_name)).await
    }

    /// Replace the pending file with `retained`.
    pub async fn rewrite(&self, list_name: &str, retained: &[String]) -> Result<()> {
        write_lines_atomic(&self.path_for(list_name), retained).await
    }

    /// Re-read the pending file and drop one occurrence per line in `consumed`.
    /// Lines queued after the batch was read survive, even repeats of consumed
    /// ones. Returns how many lines were kept.
    pub async fn retain_unconsumed(&self, list_name: &str, consumed: &[String]) -> Result<usize> {
        let mut remaining: HashMap<&str, usize> = HashMap::new();
        for line in consumed {
            *remaining.entry(line.as_str()).or_insert(0) += 1;
        }
        let current = self.read(list_name).await?;
        let retained: Vec<String> = current
            .into_iter()
            .filter(|l| match remaining.get_mut(l.as_str()) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    false
                }
                _ => true,
            })
            .collect();
        self.rewrite(list_name, &retained).await?;
        debug!(list = %list_name, kept = retained.len(), "rewrote pending file");
        Ok(retained.len())
    }

    /// Append to the failed bucket, keeping only the newest `cap` distinct URLs.
    pub async fn append_failed(&self, list_name: &str, urls: &[String], cap: usize) -> Result<()> {
        if urls.is_empty() { return Ok(()); }
        let path = self.failed_path_for(list_name);
        let mut lines = read_lines(&path).await?;
        for url in urls {
            lines.retain(|l| l != url);
            lines.push(url.clone());
        }
        let skip = lines.len().saturating_sub(cap);
        let kept: Vec<String> = lines.into_iter().skip(skip).collect();
        write_lines_atomic(&path, &kept).await
    }

    pub async fn read_failed(&self, list_name: &str) -> Result<Vec<String>> {
        read_lines(&self.failed_path_for(list_name)).await
    }
}

async fn read_lines(path: &Path) -> Result<Vec<String>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    Ok(raw.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

async fn write_lines_atomic(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut body = lines.join("\n");
    if !body.is_empty() { body.push('\n'); }
    let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    tokio::fs::write(&tmp, body).await.with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replacing {}", path.display()))
}
