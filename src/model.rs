//! Normalized SubSNP records.
//!
//! A [`SubSnpCoreFields`] is one submission (ss) clustered under a RefSNP
//! (rs), placed on a contig and optionally on a chromosome, with up to two
//! HGVS projections. All coordinates are 1-based and inclusive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;

/// Strand relative to a reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    /// Signed value: +1 forward, -1 reverse.
    pub fn value(self) -> i32 {
        match self {
            Orientation::Forward => 1,
            Orientation::Reverse => -1,
        }
    }

    /// The opposite strand.
    pub fn reverse(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }
}

/// Composes strands: A-relative-to-B times B-relative-to-C.
impl Mul for Orientation {
    type Output = Orientation;

    fn mul(self, rhs: Orientation) -> Orientation {
        if self == rhs {
            Orientation::Forward
        } else {
            Orientation::Reverse
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Forward => write!(f, "FORWARD"),
            Orientation::Reverse => write!(f, "REVERSE"),
        }
    }
}

/// Structural kind of a variant, one per dbSNP `loc_type` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocusType {
    /// Inserted on the contig relative to the submission (`1`).
    Insertion,
    /// Exact single-position match (`2`).
    Snp,
    /// Deleted on the contig (`3`).
    Deletion,
    /// Range longer on the contig than in the submission (`4`).
    LongerOnContig,
    /// Range of equal length (`5`).
    EqualOnContig,
    /// Range shorter on the contig (`6`).
    ShorterOnContig,
}

impl LocusType {
    /// Look up a raw `loc_type` code. Returns `None` for codes outside the set.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(LocusType::Insertion),
            2 => Some(LocusType::Snp),
            3 => Some(LocusType::Deletion),
            4 => Some(LocusType::LongerOnContig),
            5 => Some(LocusType::EqualOnContig),
            6 => Some(LocusType::ShorterOnContig),
            _ => None,
        }
    }

    /// The raw `loc_type` code.
    pub fn code(self) -> i32 {
        match self {
            LocusType::Insertion => 1,
            LocusType::Snp => 2,
            LocusType::Deletion => 3,
            LocusType::LongerOnContig => 4,
            LocusType::EqualOnContig => 5,
            LocusType::ShorterOnContig => 6,
        }
    }
}

/// One HGVS projection. Either fully present or absent from a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HgvsProjection {
    pub string: String,
    pub start: i64,
    pub stop: i64,
    pub orientation: Orientation,
}

/// Which coordinate system a [`VariantCoordinates`] was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Chromosome,
    Contig,
}

/// The placement used downstream: chromosome if known, else contig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCoordinates {
    pub placement: Placement,
    pub sequence: String,
    /// `None` when the source has the sequence but no position on it.
    pub start: Option<i64>,
    /// Not normalized: insertions may end before they start.
    pub end: Option<i64>,
}

/// One normalized SubSNP row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSnpCoreFields {
    pub rs_id: i64,
    pub snp_orientation: Orientation,
    pub ss_id: i64,
    pub ss_orientation: Orientation,
    pub contig_name: Option<String>,
    pub contig_start: Option<i64>,
    pub contig_end: Option<i64>,
    pub contig_orientation: Orientation,
    pub locus_type: LocusType,
    pub chromosome: Option<String>,
    pub chromosome_start: Option<i64>,
    pub chromosome_end: Option<i64>,
    pub contig_allele: Option<String>,
    pub reference_allele: Option<String>,
    pub alternate_allele: Option<String>,
    pub alleles: Option<String>,
    pub hgvs_c: Option<HgvsProjection>,
    pub hgvs_t: Option<HgvsProjection>,
    pub batch_name: String,
}

impl SubSnpCoreFields {
    /// Chromosome placement when `chromosome` is known, else contig placement
    /// when `contig_name` is known, else `None`.
    pub fn variant_coordinates(&self) -> Option<VariantCoordinates> {
        if let Some(chromosome) = &self.chromosome {
            return Some(VariantCoordinates {
                placement: Placement::Chromosome,
                sequence: chromosome.clone(),
                start: self.chromosome_start,
                end: self.chromosome_end,
            });
        }

        self.contig_name.as_ref().map(|contig| VariantCoordinates {
            placement: Placement::Contig,
            sequence: contig.clone(),
            start: self.contig_start,
            end: self.contig_end,
        })
    }

    /// Strand of the submitted sequence relative to the contig.
    pub fn ss_to_contig_orientation(&self) -> Orientation {
        self.ss_orientation * self.snp_orientation * self.contig_orientation
    }
}

impl fmt::Display for SubSnpCoreFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ss{} (rs{}, batch {}", self.ss_id, self.rs_id, self.batch_name)?;
        if let Some(contig) = &self.contig_name {
            write!(f, ", contig {}", contig)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SubSnpCoreFields {
        SubSnpCoreFields {
            rs_id: 26201546,
            snp_orientation: Orientation::Forward,
            ss_id: 13677177,
            ss_orientation: Orientation::Forward,
            contig_name: Some("NT_455866.1".to_string()),
            contig_start: Some(1766472),
            contig_end: Some(1766472),
            contig_orientation: Orientation::Forward,
            locus_type: LocusType::Snp,
            chromosome: Some("4".to_string()),
            chromosome_start: Some(91223961),
            chromosome_end: Some(91223961),
            contig_allele: Some("T".to_string()),
            reference_allele: Some("T".to_string()),
            alternate_allele: Some("A".to_string()),
            alleles: Some("T/A".to_string()),
            hgvs_c: None,
            hgvs_t: None,
            batch_name: "CHICKEN_SNPS_BROILER".to_string(),
        }
    }

    #[test]
    fn test_orientation_algebra() {
        use Orientation::*;
        assert_eq!(Forward.value(), 1);
        assert_eq!(Reverse.value(), -1);
        assert_eq!(Forward.reverse(), Reverse);
        assert_eq!(Reverse * Reverse, Forward);
        assert_eq!(Reverse * Forward, Reverse);
        assert_eq!(Forward * Forward, Forward);
    }

    #[test]
    fn test_locus_type_codes() {
        for code in 1..=6 {
            let locus = LocusType::from_code(code).unwrap();
            assert_eq!(locus.code(), code);
        }
        assert_eq!(LocusType::from_code(0), None);
        assert_eq!(LocusType::from_code(7), None);
    }

    #[test]
    fn test_coordinates_prefer_chromosome() {
        let coords = record().variant_coordinates().unwrap();
        assert_eq!(coords.placement, Placement::Chromosome);
        assert_eq!(coords.sequence, "4");
        assert_eq!((coords.start, coords.end), (Some(91223961), Some(91223961)));
    }

    #[test]
    fn test_coordinates_fall_back_to_contig() {
        let mut rec = record();
        rec.chromosome = None;
        rec.chromosome_start = None;
        rec.chromosome_end = None;

        let coords = rec.variant_coordinates().unwrap();
        assert_eq!(coords.placement, Placement::Contig);
        assert_eq!(coords.sequence, "NT_455866.1");
        assert_eq!(coords.start, Some(1766472));
    }

    #[test]
    fn test_chromosome_without_position_is_still_placed() {
        let mut rec = record();
        rec.chromosome_start = None;
        rec.chromosome_end = None;
        rec.contig_name = None;
        rec.contig_start = None;
        rec.contig_end = None;

        let coords = rec.variant_coordinates().unwrap();
        assert_eq!(coords.placement, Placement::Chromosome);
        assert_eq!(coords.sequence, "4");
        assert_eq!(coords.start, None);
    }

    #[test]
    fn test_contig_without_position_is_still_placed() {
        let mut rec = record();
        rec.chromosome = None;
        rec.chromosome_start = None;
        rec.chromosome_end = None;
        rec.contig_start = None;
        rec.contig_end = None;

        let coords = rec.variant_coordinates().unwrap();
        assert_eq!(coords.placement, Placement::Contig);
        assert_eq!(coords.sequence, "NT_455866.1");
    }

    #[test]
    fn test_no_sequence_is_no_placement() {
        let mut rec = record();
        rec.chromosome = None;
        rec.contig_name = None;
        assert_eq!(rec.variant_coordinates(), None);
    }

    #[test]
    fn test_insertion_range_is_kept() {
        let mut rec = record();
        rec.locus_type = LocusType::Insertion;
        rec.chromosome = None;
        rec.contig_start = Some(1766473);
        rec.contig_end = Some(1766472);

        let coords = rec.variant_coordinates().unwrap();
        assert_eq!((coords.start, coords.end), (Some(1766473), Some(1766472)));
    }

    #[test]
    fn test_ss_to_contig_orientation() {
        let mut rec = record();
        rec.ss_orientation = Orientation::Reverse;
        rec.contig_orientation = Orientation::Reverse;
        assert_eq!(rec.ss_to_contig_orientation(), Orientation::Forward);

        rec.snp_orientation = Orientation::Reverse;
        assert_eq!(rec.ss_to_contig_orientation(), Orientation::Reverse);
    }
}
