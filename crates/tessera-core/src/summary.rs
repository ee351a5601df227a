//! Run summaries: per-partition, per-class, and per-method status counts,
//! error categories, and the type names worth triaging.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tessera_ir::CoverageStatus;

use crate::campaign::CampaignReport;

/// Row counts for one group of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub covered: usize,
    pub partial: usize,
    pub uncovered: usize,
    /// Keyed by the status name, e.g. `UNCOVERED_EXEC_FAIL`.
    pub by_status: BTreeMap<String, usize>,
}

impl StatusCounts {
    pub fn add(&mut self, status: CoverageStatus) {
        self.total += 1;
        if status.is_covered() {
            self.covered += 1;
        } else if status.is_partial() {
            self.partial += 1;
        } else {
            self.uncovered += 1;
        }
        *self.by_status.entry(status.as_str().to_string()).or_default() += 1;
    }

    pub fn get(&self, status: CoverageStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }

    /// Fraction of rows covered fully or partially.
    pub fn coverage_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.covered + self.partial) as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub counts: StatusCounts,
    pub methods: BTreeMap<String, StatusCounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub counts: StatusCounts,
    pub classes: BTreeMap<String, ClassSummary>,
}

/// Error categories and offending types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub parse_errors: BTreeMap<String, usize>,
    pub partially_parsed: usize,
    pub non_public_filtered: usize,
    pub synthesis_errors: BTreeMap<String, usize>,
    pub executions: usize,
    pub execution_failures: usize,
    pub timeouts: usize,
    pub exceptions: BTreeMap<String, usize>,
    pub validation_errors: usize,
    pub non_instantiable_types: BTreeSet<String>,
    pub unresolved_operations: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub totals: StatusCounts,
    pub partitions: BTreeMap<String, PartitionSummary>,
    pub errors: ErrorSummary,
    pub augmented_types: BTreeSet<String>,
}

impl RunSummary {
    pub fn from_report(report: &CampaignReport) -> Self {
        let mut summary = RunSummary::default();
        for (key, status) in report.coverage.iter() {
            summary.totals.add(status);
            let partition = summary.partitions.entry(key.partition.clone()).or_default();
            partition.counts.add(status);
            let class = partition.classes.entry(key.class.clone()).or_default();
            class.counts.add(status);
            class.methods.entry(key.method.clone()).or_default().add(status);
        }

        let d = &report.diagnostics;
        summary.errors = ErrorSummary {
            parse_errors: d.parse_errors.clone(),
            partially_parsed: d.partially_parsed,
            non_public_filtered: d.non_public_filtered,
            synthesis_errors: d.synthesis_errors.clone(),
            executions: d.executions,
            execution_failures: d.execution_failures,
            timeouts: d.timeouts,
            exceptions: d.exceptions.clone(),
            validation_errors: report.validation_errors.len(),
            non_instantiable_types: d.non_instantiable_types.clone(),
            unresolved_operations: d.unresolved_operations.clone(),
        };
        summary.augmented_types = report.augmented_types.clone();
        summary
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_buckets() {
        let mut counts = StatusCounts::default();
        for s in [
            CoverageStatus::Covered,
            CoverageStatus::CoveredViaExternalExecution,
            CoverageStatus::PartialViaExternalExecution,
            CoverageStatus::UncoveredExecFail,
        ] {
            counts.add(s);
        }
        assert_eq!(counts.total, 4);
        assert_eq!(counts.covered, 2);
        assert_eq!(counts.partial, 1);
        assert_eq!(counts.uncovered, 1);
        assert_eq!(counts.get(CoverageStatus::UncoveredExecFail), 1);
        assert_eq!(counts.get(CoverageStatus::Uncovered), 0);
        assert_eq!(counts.coverage_ratio(), 0.75);
    }

    #[test]
    fn test_empty_ratio() {
        assert_eq!(StatusCounts::default().coverage_ratio(), 0.0);
    }
}
