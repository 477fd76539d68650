//! Row normalizer: raw extraction rows to [`SubSnpCoreFields`].
//!
//! dbSNP stores strands with a different convention in almost every table,
//! so each indicator has its own conversion function:
//!
//! | Column               | Source                          | Reverse when |
//! |----------------------|---------------------------------|--------------|
//! | `hgvs_c_orientation` | `snphgvslink.orient_c`          | `2`          |
//! | `hgvs_t_orientation` | `snphgvslink.orient_t`          | `2`          |
//! | `snp_orientation`    | `snpcontigloc.orientation`      | `1`          |
//! | `contig_orientation` | `contiginfo.orient`             | `1`          |
//! | `subsnp_orientation` | `snpsubsnplink.substrand_reversed_flag` | `1`  |
//!
//! Anything else, NULL included, is forward.

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};
use crate::model::{HgvsProjection, LocusType, Orientation, SubSnpCoreFields};
use crate::query::{REFSNP_ID_COLUMN, SUBSNP_ID_COLUMN};

/// One row as returned by the extraction query, before normalization.
///
/// Field names are the query's column aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubSnpRow {
    pub ss_id: Option<i64>,
    pub rs_id: Option<i64>,
    pub hgvs_c_string: Option<String>,
    pub hgvs_c_start: Option<i64>,
    pub hgvs_c_stop: Option<i64>,
    pub reference_c: Option<String>,
    pub hgvs_t_string: Option<String>,
    pub hgvs_t_start: Option<i64>,
    pub hgvs_t_stop: Option<i64>,
    pub reference_t: Option<String>,
    pub alternate: Option<String>,
    pub alleles: Option<String>,
    pub contig_name: Option<String>,
    pub contig_start: Option<i64>,
    pub contig_end: Option<i64>,
    pub loc_type: Option<i32>,
    pub chromosome: Option<String>,
    pub chromosome_start: Option<i64>,
    pub chromosome_end: Option<i64>,
    pub batch_name: Option<String>,
    pub hgvs_c_orientation: Option<i32>,
    pub hgvs_t_orientation: Option<i32>,
    pub snp_orientation: Option<i32>,
    pub contig_orientation: Option<i32>,
    pub subsnp_orientation: Option<i32>,
}

/// `snphgvslink.orient_c`: 2 is reverse.
pub fn hgvs_c_orientation(raw: Option<i32>) -> Orientation {
    match raw {
        Some(2) => Orientation::Reverse,
        _ => Orientation::Forward,
    }
}

/// `snphgvslink.orient_t`: 2 is reverse.
pub fn hgvs_t_orientation(raw: Option<i32>) -> Orientation {
    match raw {
        Some(2) => Orientation::Reverse,
        _ => Orientation::Forward,
    }
}

/// `snpcontigloc.orientation`: 1 is reverse.
pub fn snp_orientation(raw: Option<i32>) -> Orientation {
    match raw {
        Some(1) => Orientation::Reverse,
        _ => Orientation::Forward,
    }
}

/// `contiginfo.orient`: 1 is reverse.
pub fn contig_orientation(raw: Option<i32>) -> Orientation {
    match raw {
        Some(1) => Orientation::Reverse,
        _ => Orientation::Forward,
    }
}

/// `snpsubsnplink.substrand_reversed_flag`: 1 is reverse.
pub fn subsnp_orientation(raw: Option<i32>) -> Orientation {
    match raw {
        Some(1) => Orientation::Reverse,
        _ => Orientation::Forward,
    }
}

/// Build an HGVS projection, present only when its string is.
fn hgvs_projection(
    group: char,
    ss_id: i64,
    string: Option<String>,
    start: Option<i64>,
    stop: Option<i64>,
    orientation: Orientation,
) -> ImportResult<Option<HgvsProjection>> {
    match (string, start, stop) {
        (None, _, _) => Ok(None),
        (Some(string), Some(start), Some(stop)) => Ok(Some(HgvsProjection {
            string,
            start,
            stop,
            orientation,
        })),
        (Some(_), _, _) => Err(ImportError::PartialHgvs { group, ss_id }),
    }
}

/// Normalize one row. Pure; fails only on rows a consistent source cannot produce.
pub fn map_row(row: SubSnpRow) -> ImportResult<SubSnpCoreFields> {
    let ss_id = row
        .ss_id
        .ok_or_else(|| ImportError::missing(SUBSNP_ID_COLUMN, None))?;
    let rs_id = row
        .rs_id
        .ok_or_else(|| ImportError::missing(REFSNP_ID_COLUMN, Some(ss_id)))?;

    let code = row
        .loc_type
        .ok_or_else(|| ImportError::missing("loc_type", Some(ss_id)))?;
    let locus_type =
        LocusType::from_code(code).ok_or(ImportError::UnknownLocusType { code, ss_id })?;

    let batch_name = row
        .batch_name
        .ok_or_else(|| ImportError::missing("batch_name", Some(ss_id)))?;

    let hgvs_c = hgvs_projection(
        'c',
        ss_id,
        row.hgvs_c_string,
        row.hgvs_c_start,
        row.hgvs_c_stop,
        hgvs_c_orientation(row.hgvs_c_orientation),
    )?;
    let hgvs_t = hgvs_projection(
        't',
        ss_id,
        row.hgvs_t_string,
        row.hgvs_t_start,
        row.hgvs_t_stop,
        hgvs_t_orientation(row.hgvs_t_orientation),
    )?;

    Ok(SubSnpCoreFields {
        rs_id,
        snp_orientation: snp_orientation(row.snp_orientation),
        ss_id,
        ss_orientation: subsnp_orientation(row.subsnp_orientation),
        contig_name: row.contig_name,
        contig_start: row.contig_start,
        contig_end: row.contig_end,
        contig_orientation: contig_orientation(row.contig_orientation),
        locus_type,
        chromosome: row.chromosome,
        chromosome_start: row.chromosome_start,
        chromosome_end: row.chromosome_end,
        contig_allele: row.reference_t,
        reference_allele: row.reference_c,
        alternate_allele: row.alternate,
        alleles: row.alleles,
        hgvs_c,
        hgvs_t,
        batch_name,
    })
}
