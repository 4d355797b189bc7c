use crate::model::RegionRecord;

/// Regions ordered by cumulative cases, highest first
pub type RankedTable = Vec<RegionRecord>;

/// Rank regions by `cases` descending.
///
/// The sort is stable: regions with equal case counts keep their input order,
/// so the ranking is a deterministic function of the input sequence.
pub fn rank(records: &[RegionRecord]) -> RankedTable {
    let mut ranked = records.to_vec();
    // slice::sort_by is stable
    ranked.sort_by(|a, b| b.cases.cmp(&a.cases));
    ranked
}
