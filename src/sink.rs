//! Destinations for normalized records.

use std::io::Write;

use async_trait::async_trait;

use crate::error::{ImportError, ImportResult};
use crate::model::SubSnpCoreFields;

/// Accepts records in chunks, in stream order.
#[async_trait]
pub trait SubSnpSink: Send {
    async fn write(&mut self, chunk: &[SubSnpCoreFields]) -> ImportResult<()>;

    /// Flush anything buffered. Called once after the last chunk.
    async fn flush(&mut self) -> ImportResult<()> {
        Ok(())
    }
}

/// Collects records in memory.
#[async_trait]
impl SubSnpSink for Vec<SubSnpCoreFields> {
    async fn write(&mut self, chunk: &[SubSnpCoreFields]) -> ImportResult<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> SubSnpSink for JsonLinesSink<W> {
    async fn write(&mut self, chunk: &[SubSnpCoreFields]) -> ImportResult<()> {
        for record in chunk {
            serde_json::to_writer(&mut self.writer, record)
                .map_err(|e| ImportError::Sink(format!("ss{}: {}", record.ss_id, e)))?;
            self.writer
                .write_all(b"\n")
                .map_err(|e| ImportError::Sink(format!("ss{}: {}", record.ss_id, e)))?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> ImportResult<()> {
        self.writer
            .flush()
            .map_err(|e| ImportError::Sink(format!("flush: {}", e)))
    }
}
