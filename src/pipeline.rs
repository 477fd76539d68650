//! Chunked read-filter-write loop for one extraction pass.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ImportError, ImportResult};
use crate::reader::SubSnpReader;
use crate::sink::SubSnpSink;
use crate::source::RowSource;

/// Records written per sink call unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Outcome of a completed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows received from the source.
    pub read: u64,
    /// Records dropped for lacking coordinates.
    pub filtered: u64,
    pub written: u64,
    pub chunks: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Drain `reader` into `sink`, `chunk_size` records at a time.
///
/// The reader is closed on return whether or not the pass succeeded.
pub async fn import<S, K>(
    reader: &mut SubSnpReader<S>,
    sink: &mut K,
    chunk_size: usize,
) -> ImportResult<ImportSummary>
where
    S: RowSource,
    K: SubSnpSink + ?Sized,
{
    if chunk_size == 0 {
        reader.close().await?;
        return Err(ImportError::config("chunk size must be positive"));
    }

    let started_at = Utc::now();
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut written = 0u64;
    let mut chunks = 0u64;

    loop {
        let next = reader.read().await?;
        let done = next.is_none();
        chunk.extend(next);

        if chunk.len() == chunk_size || (done && !chunk.is_empty()) {
            if let Err(err) = sink.write(&chunk).await {
                if let Err(close_err) = reader.close().await {
                    warn!("Failed to close reader after sink error: {}", close_err);
                }
                return Err(err);
            }
            written += chunk.len() as u64;
            chunks += 1;
            chunk.clear();
        }

        if done {
            break;
        }
    }

    sink.flush().await?;
    let stats = reader.stats();
    let summary = ImportSummary {
        read: stats.rows,
        filtered: stats.filtered,
        written,
        chunks,
        started_at,
        finished_at: Utc::now(),
    };

    info!(
        read = summary.read,
        filtered = summary.filtered,
        written = summary.written,
        "Import finished"
    );
    Ok(summary)
}
