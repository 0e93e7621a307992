//! Input loading.
//!
//! Reads the ordered company list from a CSV file with `kvk_number` and
//! `company_name` columns. Rows whose registry number cannot be normalized
//! are logged and skipped; an unreadable row never aborts the load.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::models::company::{normalize_registry_number, CompanyJob};

#[derive(Debug, Deserialize)]
struct RawRow {
    kvk_number: String,
    company_name: String,
}

/// Load the ordered job sequence from a CSV file.
pub fn load_jobs(path: &Path) -> Result<Vec<CompanyJob>, csv::Error> {
    let reader = csv::Reader::from_path(path)?;
    Ok(jobs_from_reader(reader))
}

fn jobs_from_reader<R: Read>(mut reader: csv::Reader<R>) -> Vec<CompanyJob> {
    let mut jobs = Vec::new();

    for (row_index, result) in reader.deserialize::<RawRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(row_index, error = %err, "skipping unreadable input row");
                continue;
            }
        };

        match normalize_registry_number(&row.kvk_number) {
            Some(registry_number) => jobs.push(CompanyJob {
                registry_number,
                name: row.company_name.trim().to_string(),
                row_index,
            }),
            None => {
                warn!(
                    row_index,
                    raw = %row.kvk_number,
                    "skipping row with invalid registry number"
                );
            }
        }
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs_from_str(csv: &str) -> Vec<CompanyJob> {
        jobs_from_reader(csv::Reader::from_reader(csv.as_bytes()))
    }

    #[test]
    fn test_loads_rows_in_order() {
        let jobs = jobs_from_str(
            "kvk_number,company_name\n12345678,Acme BV\n87654321,Globex NV\n",
        );
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].registry_number, "12345678");
        assert_eq!(jobs[0].name, "Acme BV");
        assert_eq!(jobs[0].row_index, 0);
        assert_eq!(jobs[1].registry_number, "87654321");
        assert_eq!(jobs[1].row_index, 1);
    }

    #[test]
    fn test_normalizes_messy_numbers() {
        let jobs = jobs_from_str(
            "kvk_number,company_name\n12345678.0,Floaty BV\n1234567,Short BV\n",
        );
        assert_eq!(jobs[0].registry_number, "12345678");
        assert_eq!(jobs[1].registry_number, "01234567");
    }

    #[test]
    fn test_skips_invalid_numbers_keeping_indices() {
        let jobs = jobs_from_str(
            "kvk_number,company_name\nnot-a-number,Bad BV\n12345678,Good BV\n",
        );
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].registry_number, "12345678");
        // row_index reflects the input position, not the output position
        assert_eq!(jobs[0].row_index, 1);
    }
}
