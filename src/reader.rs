//! Streaming extraction of normalized SubSNP records.
//!
//! A [`SubSnpReader`] owns one [`RowSource`] for one pass. Rows are pulled
//! in cursor batches or keyset pages only when the previous ones have been
//! consumed, then normalized and filtered one at a time:
//!
//! ```text
//! RowSource ──rows──> map_row ──record──> MissingCoordinatesFilter ──> read()
//! ```
//!
//! Any fatal error closes the source before it is returned; the reader then
//! behaves as if the stream had ended.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::error::{ImportError, ImportResult, SourceError};
use crate::filter::MissingCoordinatesFilter;
use crate::mapper::{map_row, SubSnpRow};
use crate::model::SubSnpCoreFields;
use crate::query::{Page, SubSnpQuery, DEFAULT_SHARED_SCHEMA};
use crate::source::RowSource;

/// Rows requested per cursor `FETCH` unless configured otherwise.
pub const DEFAULT_FETCH_SIZE: usize = 1000;

/// What to extract, independent of how it is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionParams {
    pub build: u32,
    pub assembly: String,
    pub assembly_types: Vec<String>,
    pub shared_schema: String,
}

impl ExtractionParams {
    pub fn new(build: u32, assembly: impl Into<String>, assembly_types: Vec<String>) -> Self {
        Self {
            build,
            assembly: assembly.into(),
            assembly_types,
            shared_schema: DEFAULT_SHARED_SCHEMA.to_string(),
        }
    }

    pub fn shared_schema(mut self, schema: impl Into<String>) -> Self {
        self.shared_schema = schema.into();
        self
    }

    fn validate(&self) -> ImportResult<()> {
        if self.assembly_types.is_empty() {
            return Err(ImportError::config("at least one assembly type is required"));
        }
        if self.assembly.is_empty() {
            return Err(ImportError::config("assembly name must not be empty"));
        }
        Ok(())
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Rows received from the source.
    pub rows: u64,
    /// Records dropped for lacking coordinates.
    pub filtered: u64,
    /// Cursor fetches or page queries issued.
    pub fetches: u64,
}

#[derive(Debug)]
enum Mode {
    Cursor {
        fetch_size: usize,
    },
    Paged {
        query: SubSnpQuery,
        page_size: i64,
        /// Grows past `page_size` while a single ss_id fills a whole page.
        limit: i64,
        after: Option<i64>,
    },
}

/// Pull-based reader over one extraction pass.
pub struct SubSnpReader<S: RowSource> {
    source: S,
    mode: Mode,
    build: u32,
    filter: MissingCoordinatesFilter,
    buffer: VecDeque<SubSnpRow>,
    exhausted: bool,
    closed: bool,
    stats: ReaderStats,
}

impl<S: RowSource> SubSnpReader<S> {
    /// Stream one batch through a single cursor.
    ///
    /// Fails with [`ImportError::BuildNotFound`] when the build's tables are missing.
    pub async fn open_cursor(
        source: S,
        params: &ExtractionParams,
        batch: i32,
        fetch_size: usize,
    ) -> ImportResult<Self> {
        params.validate()?;
        if fetch_size == 0 {
            return Err(ImportError::config("fetch size must be positive"));
        }

        let query = SubSnpQuery::for_batch(
            params.build,
            batch,
            params.assembly.clone(),
            params.assembly_types.clone(),
        )
        .shared_schema(params.shared_schema.clone());

        let mut reader = Self::new(source, params.build, Mode::Cursor { fetch_size });
        if let Err(e) = reader.source.declare_cursor(&query).await {
            let err = reader.source_error(e);
            return Err(reader.abort(err).await);
        }

        info!(
            build = params.build,
            batch,
            assembly = %params.assembly,
            "Opened SubSNP cursor"
        );
        Ok(reader)
    }

    /// Stream every batch in keyset pages of `page_size` rows ordered by ss_id.
    ///
    /// The first page is fetched here so a missing build is reported at open time.
    pub async fn open_paged(source: S, params: &ExtractionParams, page_size: i64) -> ImportResult<Self> {
        params.validate()?;
        if page_size <= 0 {
            return Err(ImportError::config(format!(
                "page size must be positive, got {}",
                page_size
            )));
        }

        let first = Page {
            after: None,
            limit: page_size,
        };
        let query = SubSnpQuery::for_page(
            params.build,
            first,
            params.assembly.clone(),
            params.assembly_types.clone(),
        )
        .shared_schema(params.shared_schema.clone());

        let mode = Mode::Paged {
            query,
            page_size,
            limit: page_size,
            after: None,
        };
        let mut reader = Self::new(source, params.build, mode);
        if let Err(err) = reader.refill().await {
            return Err(reader.abort(err).await);
        }

        info!(
            build = params.build,
            page_size,
            assembly = %params.assembly,
            "Opened paged SubSNP reader"
        );
        Ok(reader)
    }

    fn new(source: S, build: u32, mode: Mode) -> Self {
        Self {
            source,
            mode,
            build,
            filter: MissingCoordinatesFilter::new(),
            buffer: VecDeque::new(),
            exhausted: false,
            closed: false,
            stats: ReaderStats::default(),
        }
    }

    /// Next record that has coordinates, or `None` once the stream has ended.
    ///
    /// Calling again after `None` keeps returning `None`.
    pub async fn read(&mut self) -> ImportResult<Option<SubSnpCoreFields>> {
        loop {
            if self.closed {
                return Ok(None);
            }

            let row = match self.buffer.pop_front() {
                Some(row) => row,
                None if self.exhausted => {
                    info!(
                        build = self.build,
                        rows = self.stats.rows,
                        filtered = self.stats.filtered,
                        "SubSNP extraction finished"
                    );
                    self.close().await?;
                    return Ok(None);
                }
                None => {
                    if let Err(err) = self.refill().await {
                        return Err(self.abort(err).await);
                    }
                    continue;
                }
            };

            self.stats.rows += 1;
            let record = match map_row(row) {
                Ok(record) => record,
                Err(err) => return Err(self.abort(err).await),
            };

            match self.filter.process(record) {
                Some(record) => return Ok(Some(record)),
                None => self.stats.filtered += 1,
            }
        }
    }

    /// Stop reading and release the source. Buffered rows are discarded.
    pub async fn close(&mut self) -> ImportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer.clear();
        self.source.close().await.map_err(|e| self.source_error(e))
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Load the next cursor batch or page into the buffer.
    async fn refill(&mut self) -> ImportResult<()> {
        self.stats.fetches += 1;

        match &mut self.mode {
            Mode::Cursor { fetch_size } => {
                let fetch_size = *fetch_size;
                let rows = match self.source.fetch_cursor(fetch_size).await {
                    Ok(rows) => rows,
                    Err(e) => return Err(source_error(self.build, e)),
                };
                debug!(rows = rows.len(), "Fetched cursor batch");
                if rows.len() < fetch_size {
                    self.exhausted = true;
                }
                self.buffer.extend(rows);
            }
            Mode::Paged {
                query,
                page_size,
                limit,
                after,
            } => {
                let page = query.with_page(Page {
                    after: *after,
                    limit: *limit,
                });
                let mut rows = match self.source.fetch_page(&page).await {
                    Ok(rows) => rows,
                    Err(e) => return Err(source_error(self.build, e)),
                };
                debug!(rows = rows.len(), after = ?after, limit = *limit, "Fetched page");

                if (rows.len() as i64) < *limit {
                    self.exhausted = true;
                    self.buffer.extend(rows);
                    return Ok(());
                }

                // A full page may end partway through an ss_id: hold that ss_id
                // back and start the next page at it.
                let Some(last) = rows.last().and_then(|r| r.ss_id) else {
                    self.exhausted = true;
                    self.buffer.extend(rows);
                    return Ok(());
                };
                let complete = rows.partition_point(|r| r.ss_id != Some(last));
                if complete == 0 {
                    *limit = limit.saturating_mul(2);
                    debug!(ss_id = last, limit = *limit, "Page holds a single ss_id, growing");
                    return Ok(());
                }

                rows.truncate(complete);
                *after = rows.last().and_then(|r| r.ss_id).or(*after);
                *limit = *page_size;
                self.buffer.extend(rows);
            }
        }

        Ok(())
    }

    /// Close the source after a fatal error and hand the error back.
    async fn abort(&mut self, err: ImportError) -> ImportError {
        if !self.closed {
            self.closed = true;
            self.buffer.clear();
            if let Err(close_err) = self.source.close().await {
                warn!("Failed to close source after error: {}", close_err);
            }
        }
        err
    }

    fn source_error(&self, err: SourceError) -> ImportError {
        source_error(self.build, err)
    }
}

fn source_error(build: u32, err: SourceError) -> ImportError {
    match err {
        SourceError::MissingRelation(relation) if names_build_table(&relation, build) => {
            debug!(build, %relation, "Relation missing for build");
            ImportError::BuildNotFound { build }
        }
        SourceError::MissingRelation(relation) => ImportError::MissingRelation(relation),
        SourceError::Database(e) => ImportError::Source(e),
    }
}

/// True if `relation` mentions one of the `b{build}_*` tables as a whole identifier.
fn names_build_table(relation: &str, build: u32) -> bool {
    let prefix = format!("b{}_", build);
    relation.match_indices(&prefix).any(|(i, _)| {
        relation[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
    })
}
