use crate::model::{RegionOption, RegionRecord};

/// Build the region selector entries, one per record, in input order
pub fn build_catalog(records: &[RegionRecord]) -> Vec<RegionOption> {
    records
        .iter()
        .map(|record| RegionOption {
            display_name: record.country.clone(),
            selection_value: record.iso_code.clone(),
        })
        .collect()
}

/// Find the record a selection value was built from
pub fn resolve<'a>(records: &'a [RegionRecord], selection_value: &str) -> Option<&'a RegionRecord> {
    records.iter().find(|record| record.iso_code == selection_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::tests::record;

    #[test]
    fn test_catalog_one_option_per_record() {
        let records = vec![record("US", 3), record("VN", 1), record("AU", 2)];
        let catalog = build_catalog(&records);

        assert_eq!(catalog.len(), records.len());
        for (option, source) in catalog.iter().zip(&records) {
            assert_eq!(option.display_name, source.country);
            assert_eq!(option.selection_value, source.iso_code);
        }
    }

    #[test]
    fn test_catalog_round_trip() {
        let records = vec![record("US", 3), record("VN", 1), record("AU", 2)];
        for option in build_catalog(&records) {
            let found = resolve(&records, &option.selection_value).expect("option should resolve");
            assert_eq!(found.country, option.display_name);
        }
    }

    #[test]
    fn test_resolve_unknown() {
        let records = vec![record("US", 3)];
        assert!(resolve(&records, "XYZ").is_none());
        assert!(build_catalog(&[]).is_empty());
    }
}
