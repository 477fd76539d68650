//! # dbsnp-importer
//!
//! Extracts dbSNP SubSNP (ss) submissions from a build-versioned relational
//! mirror and normalizes each row into a [`SubSnpCoreFields`](model::SubSnpCoreFields)
//! with one consistent strand convention.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use dbsnp_importer::prelude::*;
//!
//! let db = DbsnpDb::connect("postgres://dbsnp@localhost/dbsnp_chicken", 2).await?;
//! let params = ExtractionParams::new(150, "Gallus_gallus-5.0", vec!["Primary_Assembly".into()]);
//!
//! let mut reader = SubSnpReader::open_cursor(db.source(), &params, 11825, 1000).await?;
//! while let Some(ss) = reader.read().await? {
//!     println!("{} on {:?}", ss, ss.variant_coordinates());
//! }
//! ```
//!
//! ## Strand conventions
//!
//! | Indicator    | Raw reverse code | Normalized           |
//! |--------------|------------------|----------------------|
//! | HGVS c / t   | `2`              | `Orientation::Reverse` |
//! | RefSNP       | `1`              | `Orientation::Reverse` |
//! | Contig       | `1`              | `Orientation::Reverse` |
//! | SubSNP       | `1`              | `Orientation::Reverse` |

pub mod config;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod reader;
pub mod sink;
pub mod source;

pub mod prelude {
    pub use crate::config::ImporterConfig;
    pub use crate::error::*;
    pub use crate::filter::MissingCoordinatesFilter;
    pub use crate::mapper::{map_row, SubSnpRow};
    pub use crate::model::*;
    pub use crate::pipeline::{import, ImportSummary};
    pub use crate::query::{BindValue, Page, SubSnpQuery, ToSql};
    pub use crate::reader::{ExtractionParams, ReaderStats, SubSnpReader};
    pub use crate::sink::{JsonLinesSink, SubSnpSink};
    pub use crate::source::{DbsnpDb, PgRowSource, RowSource};
}
