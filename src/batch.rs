//! Sequential batch rendering
//!
//! Records are rendered one at a time on a fresh canvas. A record-scoped
//! failure is logged and counted; anything else aborts the batch.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};

use crate::assets::Assets;
use crate::output::{encode_png, ensure_output_dir, mib, output_path, write_atomic};
use crate::records::RecordRow;
use crate::rendering::CardRenderer;
use crate::{Record, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutput {
    pub index: usize,
    pub id: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub index: usize,
    /// Empty when the row could not be decoded
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<RecordOutput>,
    pub failed: Vec<RecordFailure>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.succeeded.iter().map(|o| o.bytes).sum()
    }
}

pub struct BatchRunner<'a> {
    renderer: &'a CardRenderer,
    assets: &'a Assets,
    output_dir: PathBuf,
}

impl<'a> BatchRunner<'a> {
    pub fn new(renderer: &'a CardRenderer, assets: &'a Assets, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            assets,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Compose, encode and atomically write one card to `path`.
    pub fn render_to(&self, record: &Record, path: &Path) -> Result<u64> {
        let card = self.renderer.compose(record, self.assets)?;
        let png = encode_png(&card.flatten(), self.renderer.config().export.dpi)?;
        write_atomic(path, &png)
    }

    /// Render every row (or the first `limit`) into the output directory.
    pub fn run(&self, rows: Vec<RecordRow>, limit: Option<usize>) -> Result<BatchSummary> {
        ensure_output_dir(&self.output_dir)?;
        let rows: Vec<RecordRow> = match limit {
            Some(n) => rows.into_iter().take(n).collect(),
            None => rows,
        };
        let total = rows.len();
        let suffix = &self.renderer.config().export.suffix;
        let started = Instant::now();
        let mut summary = BatchSummary::default();

        info!(
            "Rendering {} record(s) into {} with {} glyphs ({:?})",
            total,
            self.output_dir.display(),
            self.assets.glyphs().name(),
            self.assets.font_tier()
        );
        for (n, row) in rows.into_iter().enumerate() {
            let record = match row.record {
                Ok(record) => record,
                Err(e) => {
                    warn!("[{}/{}] Skipping row {}: {}", n + 1, total, row.index, e);
                    summary.failed.push(RecordFailure {
                        index: row.index,
                        id: String::new(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let path = output_path(&self.output_dir, &record.id, suffix);
            match self.render_to(&record, &path) {
                Ok(bytes) => {
                    info!(
                        "[{}/{}] {} -> {} ({:.1} MiB)",
                        n + 1,
                        total,
                        record.id,
                        path.display(),
                        mib(bytes)
                    );
                    summary.succeeded.push(RecordOutput {
                        index: row.index,
                        id: record.id,
                        path,
                        bytes,
                    });
                }
                Err(e) if e.is_record_scoped() => {
                    warn!("[{}/{}] Record {} failed: {}", n + 1, total, record.id, e);
                    summary.failed.push(RecordFailure {
                        index: row.index,
                        id: record.id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Batch finished in {:.1}s: {} succeeded, {} failed, {:.1} MiB written",
            started.elapsed().as_secs_f64(),
            summary.succeeded.len(),
            summary.failed.len(),
            mib(summary.total_bytes())
        );
        for failure in &summary.failed {
            warn!("  row {} '{}': {}", failure.index, failure.id, failure.reason);
        }
        Ok(summary)
    }
}
