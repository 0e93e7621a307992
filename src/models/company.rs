use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical KvK registry numbers are exactly eight digits.
pub const REGISTRY_NUMBER_LEN: usize = 8;

/// One row of work: a company to look up in the registry.
///
/// Constructed once from the input file and immutable afterwards. The name
/// is a display label only; lookups key on the normalized registry number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyJob {
    pub registry_number: String,
    pub name: String,
    pub row_index: usize,
}

/// Tri-state outcome of a branch lookup.
///
/// `Failed` is a distinct sentinel meaning "attempted but inconclusive" and
/// is never conflated with a definitive `NoBranches`: failed records are
/// eligible for `--retry-failed` reprocessing, definitive ones are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    HasBranches,
    NoBranches,
    Failed,
}

impl BranchStatus {
    pub fn from_count(count: u32) -> Self {
        if count > 0 {
            BranchStatus::HasBranches
        } else {
            BranchStatus::NoBranches
        }
    }

    /// True for a definitive yes/no, false for the failed sentinel.
    pub fn is_resolved(self) -> bool {
        !matches!(self, BranchStatus::Failed)
    }

    /// Numeric sentinel encoding used only at the storage boundary.
    pub fn to_sentinel(self) -> i64 {
        match self {
            BranchStatus::HasBranches => 1,
            BranchStatus::NoBranches => 0,
            BranchStatus::Failed => -1,
        }
    }

    pub fn from_sentinel(value: i64) -> Self {
        match value {
            1 => BranchStatus::HasBranches,
            0 => BranchStatus::NoBranches,
            _ => BranchStatus::Failed,
        }
    }
}

/// Persisted outcome for one registry number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub registry_number: String,
    pub name: String,
    pub has_branches: BranchStatus,
    pub attempt_count: i64,
    pub last_attempt_at: DateTime<Utc>,
}

/// Normalize a raw KvK number to its canonical eight-digit form.
///
/// Input files carry the number in several shapes: plain strings, values
/// with a trailing `.0` from spreadsheet exports, prefixed forms like
/// `NL12345678`, or numbers with separators. Strategy: keep only digits,
/// drop a trailing `.0` fraction first, round-trip through an integer to
/// collapse leading zeros, then left-pad back to eight digits. Returns
/// `None` when the result is not exactly eight digits.
pub fn normalize_registry_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    // Spreadsheet exports encode the column as float ("12345678.0").
    let integral = trimmed.split('.').next().unwrap_or(trimmed);

    let digits: String = integral.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let number: u64 = digits.parse().ok()?;
    let canonical = format!("{:08}", number);

    if canonical.len() != REGISTRY_NUMBER_LEN {
        return None;
    }

    Some(canonical)
}
