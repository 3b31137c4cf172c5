use std::path::{Path, PathBuf};

use super::buffer::LineItemBuffer;
use super::quality::QualityLog;

/// Mutable state of one silver run, owned by the orchestrator and lent to every
/// routing and cleaning call. A fresh context starts with an empty log and buffer.
#[derive(Debug)]
pub struct SilverContext {
    silver_dir: PathBuf,
    pub quality: QualityLog,
    pub line_items: LineItemBuffer,
}

impl SilverContext {
    pub fn new(silver_dir: impl Into<PathBuf>) -> Self {
        Self {
            silver_dir: silver_dir.into(),
            quality: QualityLog::new(),
            line_items: LineItemBuffer::new(),
        }
    }

    /// Destination folder for canonical outputs
    pub fn silver_dir(&self) -> &Path {
        &self.silver_dir
    }
}
