//! SQL builder for SubSNP extraction.
//!
//! Per-build tables carry the build number as a prefix (`b150_snpcontigloc`),
//! so the query text is rendered per build while every caller-supplied value
//! stays a bound parameter.
//!
//! ```text
//! b{build}_snpcontigloc loc ─┬─ b{build}_contiginfo ctg     (placement, assembly)
//!                            ├─ snpsubsnplink link          (rs ↔ ss)
//!                            │    └─ subsnp sub ─┬─ batch
//!                            │                   └─ {shared}.obsvariation
//!                            └─ b{build}_snphgvslink hgvs   (HGVS projections)
//! ```

use std::fmt;

pub const SUBSNP_ID_COLUMN: &str = "ss_id";
pub const REFSNP_ID_COLUMN: &str = "rs_id";
pub const HGVS_C_STRING: &str = "hgvs_c_string";
pub const HGVS_C_START: &str = "hgvs_c_start";
pub const HGVS_C_STOP: &str = "hgvs_c_stop";
pub const REFERENCE_C: &str = "reference_c";
pub const HGVS_T_STRING: &str = "hgvs_t_string";
pub const HGVS_T_START: &str = "hgvs_t_start";
pub const HGVS_T_STOP: &str = "hgvs_t_stop";
pub const REFERENCE_T: &str = "reference_t";
pub const ALTERNATE: &str = "alternate";
pub const ALLELES: &str = "alleles";
pub const CONTIG_NAME_COLUMN: &str = "contig_name";
pub const CONTIG_START_COLUMN: &str = "contig_start";
pub const CONTIG_END_COLUMN: &str = "contig_end";
pub const LOC_TYPE_COLUMN: &str = "loc_type";
pub const CHROMOSOME_COLUMN: &str = "chromosome";
pub const CHROMOSOME_START_COLUMN: &str = "chromosome_start";
pub const CHROMOSOME_END_COLUMN: &str = "chromosome_end";
pub const BATCH_COLUMN: &str = "batch_name";
pub const HGVS_C_ORIENTATION: &str = "hgvs_c_orientation";
pub const HGVS_T_ORIENTATION: &str = "hgvs_t_orientation";
pub const SNP_ORIENTATION_COLUMN: &str = "snp_orientation";
pub const CONTIG_ORIENTATION_COLUMN: &str = "contig_orientation";
pub const SUBSNP_ORIENTATION_COLUMN: &str = "subsnp_orientation";

/// Schema holding the build-independent `obsvariation` table.
pub const DEFAULT_SHARED_SCHEMA: &str = "dbsnp_shared";

const SNP_CONTIG_LOC_TABLE: &str = "snpcontigloc";
const CONTIG_INFO_TABLE: &str = "contiginfo";
const SNP_HGVS_LINK_TABLE: &str = "snphgvslink";

/// Trait for rendering a query to SQL text.
pub trait ToSql {
    /// Convert this query to a SQL string.
    fn to_sql(&self) -> String;
}

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Int(i64),
    Text(String),
    TextArray(Vec<String>),
}

impl fmt::Display for BindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindValue::Null => write!(f, "NULL"),
            BindValue::Int(n) => write!(f, "{}", n),
            BindValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            BindValue::TextArray(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}'", item.replace('\'', "''"))?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// One keyset page: rows with `ss_id` strictly greater than `after`, at most `limit` of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub after: Option<i64>,
    pub limit: i64,
}

/// How the rows are restricted beyond assembly and group terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A single submission batch, read through one cursor.
    Batch(i32),
    /// Every batch, read page by page.
    Paged(Page),
}

/// A fully specified extraction query.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSnpQuery {
    pub build: u32,
    pub scope: Scope,
    /// Exact assembly name, matched against `contiginfo.group_label`.
    pub assembly: String,
    /// Accepted `contiginfo.group_term` values, e.g. `Primary_Assembly`.
    pub assembly_types: Vec<String>,
    pub shared_schema: String,
}

impl SubSnpQuery {
    /// Query for one batch, ordered for cursor streaming.
    pub fn for_batch(
        build: u32,
        batch: i32,
        assembly: impl Into<String>,
        assembly_types: Vec<String>,
    ) -> Self {
        Self {
            build,
            scope: Scope::Batch(batch),
            assembly: assembly.into(),
            assembly_types,
            shared_schema: DEFAULT_SHARED_SCHEMA.to_string(),
        }
    }

    /// Query for one keyset page across all batches.
    pub fn for_page(
        build: u32,
        page: Page,
        assembly: impl Into<String>,
        assembly_types: Vec<String>,
    ) -> Self {
        Self {
            build,
            scope: Scope::Paged(page),
            assembly: assembly.into(),
            assembly_types,
            shared_schema: DEFAULT_SHARED_SCHEMA.to_string(),
        }
    }

    /// Override the schema of the `obsvariation` table.
    pub fn shared_schema(mut self, schema: impl Into<String>) -> Self {
        self.shared_schema = schema.into();
        self
    }

    /// The same query moved to another page.
    pub fn with_page(&self, page: Page) -> Self {
        Self {
            scope: Scope::Paged(page),
            ..self.clone()
        }
    }

    /// Name of a per-build table, e.g. `b150_snpcontigloc`.
    pub fn build_table(&self, table: &str) -> String {
        format!("b{}_{}", self.build, table)
    }

    /// Bind values in placeholder order.
    ///
    /// Batch mode: `[batch, assembly_types, assembly]`.
    /// Paged mode: `[assembly_types, assembly, after, limit]`.
    pub fn binds(&self) -> Vec<BindValue> {
        let types = BindValue::TextArray(self.assembly_types.clone());
        let assembly = BindValue::Text(self.assembly.clone());

        match self.scope {
            Scope::Batch(batch) => vec![BindValue::Int(batch as i64), types, assembly],
            Scope::Paged(page) => vec![
                types,
                assembly,
                page.after.map(BindValue::Int).unwrap_or(BindValue::Null),
                BindValue::Int(page.limit),
            ],
        }
    }

    fn select_list(&self) -> String {
        let columns = [
            format!("CAST(sub.subsnp_id AS BIGINT) AS {}", SUBSNP_ID_COLUMN),
            format!("CAST(loc.snp_id AS BIGINT) AS {}", REFSNP_ID_COLUMN),
            format!("hgvs.hgvs_c AS {}", HGVS_C_STRING),
            format!("CAST(hgvs.start_c + 1 AS BIGINT) AS {}", HGVS_C_START),
            format!("CAST(hgvs.stop_c + 1 AS BIGINT) AS {}", HGVS_C_STOP),
            format!("hgvs.ref_allele_c AS {}", REFERENCE_C),
            format!("hgvs.hgvs_t AS {}", HGVS_T_STRING),
            format!("CAST(hgvs.start_t + 1 AS BIGINT) AS {}", HGVS_T_START),
            format!("CAST(hgvs.stop_t + 1 AS BIGINT) AS {}", HGVS_T_STOP),
            format!("hgvs.ref_allele_t AS {}", REFERENCE_T),
            format!("hgvs.var_allele AS {}", ALTERNATE),
            format!("obsvariation.pattern AS {}", ALLELES),
            format!("ctg.contig_name AS {}", CONTIG_NAME_COLUMN),
            format!("CAST(loc.asn_from + 1 AS BIGINT) AS {}", CONTIG_START_COLUMN),
            format!("CAST(loc.asn_to + 1 AS BIGINT) AS {}", CONTIG_END_COLUMN),
            format!("CAST(loc.loc_type AS INTEGER) AS {}", LOC_TYPE_COLUMN),
            format!("ctg.contig_chr AS {}", CHROMOSOME_COLUMN),
            format!("CAST(loc.phys_pos_from + 1 AS BIGINT) AS {}", CHROMOSOME_START_COLUMN),
            format!(
                "CAST(loc.phys_pos_from + 1 + loc.asn_to - loc.asn_from AS BIGINT) AS {}",
                CHROMOSOME_END_COLUMN
            ),
            format!("batch.loc_batch_id_upp AS {}", BATCH_COLUMN),
            // Raw strand codes; see `mapper` for their per-table meaning.
            format!("CAST(hgvs.orient_c AS INTEGER) AS {}", HGVS_C_ORIENTATION),
            format!("CAST(hgvs.orient_t AS INTEGER) AS {}", HGVS_T_ORIENTATION),
            format!("CAST(loc.orientation AS INTEGER) AS {}", SNP_ORIENTATION_COLUMN),
            format!("CAST(ctg.orient AS INTEGER) AS {}", CONTIG_ORIENTATION_COLUMN),
            format!(
                "CAST(link.substrand_reversed_flag AS INTEGER) AS {}",
                SUBSNP_ORIENTATION_COLUMN
            ),
        ];
        columns.join(", ")
    }

    fn from_clause(&self) -> String {
        format!(
            "{} loc \
             JOIN {} ctg ON ctg.ctg_id = loc.ctg_id \
             JOIN snpsubsnplink link ON loc.snp_id = link.snp_id \
             JOIN subsnp sub ON link.subsnp_id = sub.subsnp_id \
             JOIN batch ON sub.batch_id = batch.batch_id \
             JOIN {} hgvs ON hgvs.snp_link = loc.snp_id \
             JOIN {}.obsvariation ON obsvariation.var_id = sub.variation_id",
            self.build_table(SNP_CONTIG_LOC_TABLE),
            self.build_table(CONTIG_INFO_TABLE),
            self.build_table(SNP_HGVS_LINK_TABLE),
            self.shared_schema,
        )
    }
}

impl ToSql for SubSnpQuery {
    fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT DISTINCT ");
        sql.push_str(&self.select_list());
        sql.push_str(" FROM ");
        sql.push_str(&self.from_clause());

        let where_clauses: Vec<&str> = match self.scope {
            Scope::Batch(_) => vec![
                "batch.batch_id = $1",
                "ctg.group_term = ANY($2)",
                "ctg.group_label LIKE $3",
            ],
            Scope::Paged(_) => vec![
                "ctg.group_term = ANY($1)",
                "ctg.group_label LIKE $2",
                "(CAST($3 AS BIGINT) IS NULL OR sub.subsnp_id > $3)",
            ],
        };
        sql.push_str(" WHERE ");
        sql.push_str(&where_clauses.join(" AND "));

        sql.push_str(&format!(
            " ORDER BY {} ASC, {} ASC",
            SUBSNP_ID_COLUMN, REFSNP_ID_COLUMN
        ));

        if let Scope::Paged(_) = self.scope {
            sql.push_str(" LIMIT $4");
        }

        sql
    }
}
