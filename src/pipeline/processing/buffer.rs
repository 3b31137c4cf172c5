use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::table::parquet::write_parquet;
use crate::table::RecordSet;
use crate::types::TableId;

/// Accumulates cleaned line-item parts so the table is written once, as the
/// union of every contributing file.
#[derive(Debug, Default)]
pub struct LineItemBuffer {
    parts: Vec<RecordSet>,
}

impl LineItemBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: RecordSet) {
        info!(rows = part.num_rows(), parts = self.parts.len() + 1, "buffered line item rows");
        self.parts.push(part);
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> usize {
        self.parts.len()
    }

    pub fn rows(&self) -> usize {
        self.parts.iter().map(RecordSet::num_rows).sum()
    }

    /// Concatenate and write every buffered part to `silver_dir`, leaving the
    /// buffer empty. Returns the rows written, or `None` when nothing was buffered.
    pub fn flush(&mut self, silver_dir: &Path) -> Result<Option<usize>> {
        if self.parts.is_empty() {
            warn!("no operations line items collected");
            return Ok(None);
        }
        let combined = RecordSet::concat(std::mem::take(&mut self.parts));
        let path = silver_dir.join(TableId::OperationsLineItems.file_name());
        write_parquet(&combined, &path)?;
        info!(
            table = %TableId::OperationsLineItems,
            rows = combined.num_rows(),
            "saved buffered line items"
        );
        Ok(Some(combined.num_rows()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parquet::read_parquet;
    use crate::table::Value;
    use tempfile::TempDir;

    #[test]
    fn test_flush_writes_union_of_parts() {
        let dir = TempDir::new().unwrap();
        let mut buffer = LineItemBuffer::new();
        buffer.push(
            RecordSet::from_columns(vec![("order_id", vec!["o1".into(), "o2".into()])]).unwrap(),
        );
        buffer.push(
            RecordSet::from_columns(vec![
                ("order_id", vec!["o3".into()]),
                ("price", vec![Value::Float(2.0)]),
            ])
            .unwrap(),
        );
        assert_eq!(buffer.rows(), 3);

        assert_eq!(buffer.flush(dir.path()).unwrap(), Some(3));
        assert!(buffer.is_empty());

        let written = read_parquet(&dir.path().join("operations_line_items.parquet")).unwrap();
        assert_eq!(written.num_rows(), 3);
        assert_eq!(written.column_names(), vec!["order_id", "price"]);
    }

    #[test]
    fn test_empty_flush_writes_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(LineItemBuffer::new().flush(dir.path()).unwrap(), None);
        assert!(!dir.path().join("operations_line_items.parquet").exists());
    }
}
