//! In-memory dbSNP mirror for driving readers without PostgreSQL.
//!
//! Rows are tagged with the batch and contig assembly columns the real query
//! filters on, and queries are evaluated with the same semantics: exact batch,
//! group term membership, exact assembly label, ordered by (ss_id, rs_id).

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbsnp_importer::error::SourceError;
use dbsnp_importer::mapper::SubSnpRow;
use dbsnp_importer::query::{Scope, SubSnpQuery, DEFAULT_SHARED_SCHEMA};
use dbsnp_importer::source::RowSource;

pub const BUILD: u32 = 150;
pub const CHICKEN_ASSEMBLY_4: &str = "Gallus_gallus-4.0";
pub const CHICKEN_ASSEMBLY_5: &str = "Gallus_gallus-5.0";
pub const PRIMARY_ASSEMBLY: &str = "Primary_Assembly";
pub const NON_NUCLEAR: &str = "non-nuclear";

pub const BROILER_BATCH: i32 = 11825;
pub const SINGLE_SNP_BATCH: i32 = 1062063;
pub const INDEL_BATCH: i32 = 1062064;
pub const MULTIALLELIC_BATCH: i32 = 20001;
pub const CORRUPT_BATCH: i32 = 99;

#[derive(Debug, Clone)]
pub struct FixtureRow {
    pub batch_id: i32,
    pub group_term: String,
    pub group_label: String,
    pub row: SubSnpRow,
}

/// What the reader did to the source.
#[derive(Debug, Default)]
pub struct SourceLog {
    pub declared: usize,
    pub fetches: usize,
    pub pages: Vec<(Option<i64>, i64)>,
    pub closes: usize,
}

pub struct FixtureSource {
    builds: Vec<u32>,
    /// Schema that holds `obsvariation`.
    shared_schema: String,
    rows: Vec<FixtureRow>,
    cursor: VecDeque<SubSnpRow>,
    /// Fail with a connection error on this fetch (1-based).
    fail_on_fetch: Option<usize>,
    log: Arc<Mutex<SourceLog>>,
}

impl FixtureSource {
    pub fn new(rows: Vec<FixtureRow>) -> Self {
        Self {
            builds: vec![BUILD],
            shared_schema: DEFAULT_SHARED_SCHEMA.to_string(),
            rows,
            cursor: VecDeque::new(),
            fail_on_fetch: None,
            log: Arc::new(Mutex::new(SourceLog::default())),
        }
    }

    pub fn failing_on_fetch(mut self, fetch: usize) -> Self {
        self.fail_on_fetch = Some(fetch);
        self
    }

    pub fn log(&self) -> Arc<Mutex<SourceLog>> {
        Arc::clone(&self.log)
    }

    fn check_build(&self, query: &SubSnpQuery) -> Result<(), SourceError> {
        if !self.builds.contains(&query.build) {
            return Err(SourceError::MissingRelation(format!(
                "relation \"b{}_snpcontigloc\" does not exist",
                query.build
            )));
        }
        if query.shared_schema != self.shared_schema {
            return Err(SourceError::MissingRelation(format!(
                "relation \"{}.obsvariation\" does not exist",
                query.shared_schema
            )));
        }
        Ok(())
    }

    fn count_fetch(&self) -> Result<(), SourceError> {
        let mut log = self.log.lock().unwrap();
        log.fetches += 1;
        if Some(log.fetches) == self.fail_on_fetch {
            return Err(SourceError::Database(sqlx::Error::Protocol(
                "connection reset by peer".to_string(),
            )));
        }
        Ok(())
    }

    fn select(&self, query: &SubSnpQuery) -> Vec<SubSnpRow> {
        let mut rows: Vec<SubSnpRow> = self
            .rows
            .iter()
            .filter(|r| query.assembly_types.contains(&r.group_term))
            .filter(|r| r.group_label == query.assembly)
            .filter(|r| match query.scope {
                Scope::Batch(batch) => r.batch_id == batch,
                Scope::Paged(page) => match (page.after, r.row.ss_id) {
                    (Some(after), Some(ss_id)) => ss_id > after,
                    _ => true,
                },
            })
            .map(|r| r.row.clone())
            .collect();
        rows.sort_by_key(|r| (r.ss_id, r.rs_id));
        rows
    }
}

#[async_trait]
impl RowSource for FixtureSource {
    async fn declare_cursor(&mut self, query: &SubSnpQuery) -> Result<(), SourceError> {
        self.check_build(query)?;
        self.log.lock().unwrap().declared += 1;
        self.cursor = self.select(query).into();
        Ok(())
    }

    async fn fetch_cursor(&mut self, max_rows: usize) -> Result<Vec<SubSnpRow>, SourceError> {
        self.count_fetch()?;
        let n = max_rows.min(self.cursor.len());
        Ok(self.cursor.drain(..n).collect())
    }

    async fn fetch_page(&mut self, query: &SubSnpQuery) -> Result<Vec<SubSnpRow>, SourceError> {
        self.check_build(query)?;
        self.count_fetch()?;
        let Scope::Paged(page) = query.scope else {
            panic!("page fetch with a batch-scoped query");
        };
        self.log.lock().unwrap().pages.push((page.after, page.limit));

        let mut rows = self.select(query);
        rows.truncate(page.limit as usize);
        Ok(rows)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.log.lock().unwrap().closes += 1;
        self.cursor.clear();
        Ok(())
    }
}

fn text(s: &str) -> Option<String> {
    Some(s.to_string())
}

/// A chromosome-placed SNP on NT_455866.1 / chr 4 with both HGVS projections.
pub fn snp_row(ss_id: i64, rs_id: i64, alternate: &str, alleles: &str, batch_name: &str) -> SubSnpRow {
    SubSnpRow {
        ss_id: Some(ss_id),
        rs_id: Some(rs_id),
        hgvs_c_string: Some(format!("NC_006091.4:g.91223961T>{}", alternate)),
        hgvs_c_start: Some(91223961),
        hgvs_c_stop: Some(91223961),
        reference_c: text("T"),
        hgvs_t_string: Some(format!("NT_455866.1:g.1766472T>{}", alternate)),
        hgvs_t_start: Some(1766472),
        hgvs_t_stop: Some(1766472),
        reference_t: text("T"),
        alternate: text(alternate),
        alleles: text(alleles),
        contig_name: text("NT_455866.1"),
        contig_start: Some(1766472),
        contig_end: Some(1766472),
        loc_type: Some(2),
        chromosome: text("4"),
        chromosome_start: Some(91223961),
        chromosome_end: Some(91223961),
        batch_name: text(batch_name),
        hgvs_c_orientation: Some(1),
        hgvs_t_orientation: Some(1),
        snp_orientation: Some(0),
        contig_orientation: Some(-1),
        subsnp_orientation: Some(0),
    }
}

fn tagged(batch_id: i32, group_term: &str, group_label: &str, row: SubSnpRow) -> FixtureRow {
    FixtureRow {
        batch_id,
        group_term: group_term.to_string(),
        group_label: group_label.to_string(),
        row,
    }
}

/// The chicken mirror used across the extraction tests.
pub fn chicken_rows() -> Vec<FixtureRow> {
    let broiler = |row| tagged(BROILER_BATCH, PRIMARY_ASSEMBLY, CHICKEN_ASSEMBLY_5, row);
    let mut rows = Vec::new();

    // ss13677177 is clustered under three rs, two of them multiallelic.
    rows.push(broiler(snp_row(13677177, 26963037, "C", "T/A", "CHICKEN_SNPS_BROILER")));
    rows.push(broiler(snp_row(13677177, 26201546, "A", "T/A", "CHICKEN_SNPS_BROILER")));
    rows.push(broiler(snp_row(13677177, 26201546, "C", "T/A", "CHICKEN_SNPS_BROILER")));
    let mut reverse_rs = snp_row(13677177, 26954817, "A", "G/A", "CHICKEN_SNPS_BROILER");
    reverse_rs.snp_orientation = Some(1);
    rows.push(broiler(reverse_rs));
    rows.push(broiler(snp_row(13677177, 26963037, "A", "T/A", "CHICKEN_SNPS_BROILER")));

    // All four rs/contig orientation combinations.
    let mut fr = snp_row(13677200, 1060492716, "A", "T/A", "CHICKEN_SNPS_BROILER");
    fr.contig_orientation = Some(1);
    rows.push(broiler(fr));
    let mut rf = snp_row(13677201, 1060492473, "A", "T/A", "CHICKEN_SNPS_BROILER");
    rf.snp_orientation = Some(1);
    rows.push(broiler(rf));
    let mut rr = snp_row(13677202, 733889725, "A", "T/A", "CHICKEN_SNPS_BROILER");
    rr.snp_orientation = Some(1);
    rr.contig_orientation = Some(1);
    rows.push(broiler(rr));

    // Contig-only placement survives the filter.
    let mut unplaced_chr = snp_row(13677300, 1060492800, "G", "T/G", "CHICKEN_SNPS_BROILER");
    unplaced_chr.chromosome = None;
    unplaced_chr.chromosome_start = None;
    unplaced_chr.chromosome_end = None;
    rows.push(broiler(unplaced_chr));

    // No placement at all: dropped.
    let mut unplaced = snp_row(13677301, 1060492801, "G", "T/G", "CHICKEN_SNPS_BROILER");
    unplaced.chromosome = None;
    unplaced.chromosome_start = None;
    unplaced.chromosome_end = None;
    unplaced.contig_name = None;
    unplaced.contig_start = None;
    unplaced.contig_end = None;
    rows.push(broiler(unplaced));

    // Same batch, mitochondrial contig.
    rows.push(tagged(
        BROILER_BATCH,
        NON_NUCLEAR,
        CHICKEN_ASSEMBLY_5,
        snp_row(13677400, 1060492900, "A", "T/A", "CHICKEN_SNPS_BROILER"),
    ));

    // One SNP, one cluster, no transcript projection.
    let mut single = snp_row(1540359000, 1540359001, "G", "A/G", "CHICKEN_SNP_SINGLE");
    single.hgvs_t_string = None;
    single.hgvs_t_start = None;
    single.hgvs_t_stop = None;
    single.reference_t = None;
    single.hgvs_t_orientation = None;
    rows.push(tagged(SINGLE_SNP_BATCH, PRIMARY_ASSEMBLY, CHICKEN_ASSEMBLY_5, single));

    // A deletion placed on the previous assembly only.
    rows.push(tagged(
        INDEL_BATCH,
        PRIMARY_ASSEMBLY,
        CHICKEN_ASSEMBLY_4,
        SubSnpRow {
            ss_id: Some(739617577),
            rs_id: Some(1540359250),
            hgvs_c_string: text("NC_006090.4:g.47119827_47119830delTCGG"),
            hgvs_c_start: Some(47119827),
            hgvs_c_stop: Some(47119830),
            reference_c: text("TCGG"),
            hgvs_t_string: text("NT_455837.1:g.11724980_11724983delCCGA"),
            hgvs_t_start: Some(11724980),
            hgvs_t_stop: Some(11724983),
            reference_t: text("TCGG"),
            alternate: None,
            alleles: text("TCGG/-"),
            contig_name: text("NT_455837.1"),
            contig_start: Some(11724980),
            contig_end: Some(11724983),
            loc_type: Some(3),
            chromosome: text("3"),
            chromosome_start: Some(47119827),
            chromosome_end: Some(47119830),
            batch_name: text("CHICKEN_INDEL_DWBURT"),
            hgvs_c_orientation: Some(1),
            hgvs_t_orientation: Some(2),
            snp_orientation: Some(0),
            contig_orientation: Some(1),
            subsnp_orientation: Some(1),
        },
    ));

    // Three submissions on one cluster, one alternate each.
    for (ss_id, alternate) in [(900000003, "G"), (900000001, "A"), (900000002, "C")] {
        rows.push(tagged(
            MULTIALLELIC_BATCH,
            PRIMARY_ASSEMBLY,
            CHICKEN_ASSEMBLY_5,
            snp_row(ss_id, 315000001, alternate, "T/A/C/G", "CHICKEN_MULTIALLELIC"),
        ));
    }

    // A row with no rs_id.
    let mut corrupt = snp_row(950000000, 0, "A", "T/A", "CHICKEN_CORRUPT");
    corrupt.rs_id = None;
    rows.push(tagged(CORRUPT_BATCH, PRIMARY_ASSEMBLY, CHICKEN_ASSEMBLY_5, corrupt));

    rows
}

pub fn chicken_source() -> FixtureSource {
    FixtureSource::new(chicken_rows())
}
