//! Per-row coverage bookkeeping.
//!
//! Every row starts out `UNCOVERED` when its method is first seen and is
//! recorded exactly once. The only later transition is the external
//! upgrade of an in-process execution failure.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_ir::CoverageStatus;

/// Identity of one coverage row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub partition: String,
    pub class: String,
    pub method: String,
    pub row: usize,
}

impl RowKey {
    pub fn new(
        partition: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
        row: usize,
    ) -> Self {
        Self {
            partition: partition.into(),
            class: class.into(),
            method: method.into(),
            row,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}#{}", self.partition, self.class, self.method, self.row)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CoverageError {
    #[error("Row {key} was never initialized")]
    UnknownRow { key: RowKey },

    #[error("Row {key} was already recorded as {status}")]
    AlreadyRecorded { key: RowKey, status: CoverageStatus },

    #[error("Row {key} with status {status} cannot be upgraded by external execution")]
    NotUpgradable { key: RowKey, status: CoverageStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RowState {
    status: CoverageStatus,
    recorded: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageMap {
    rows: BTreeMap<RowKey, RowState>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `row_count` rows of a method as `UNCOVERED`. Rows already
    /// known keep their state.
    pub fn init_method(&mut self, partition: &str, class: &str, method: &str, row_count: usize) {
        for row in 0..row_count {
            self.rows
                .entry(RowKey::new(partition, class, method, row))
                .or_insert(RowState {
                    status: CoverageStatus::Uncovered,
                    recorded: false,
                });
        }
    }

    /// Record the terminal status of a row.
    pub fn record(&mut self, key: &RowKey, status: CoverageStatus) -> Result<(), CoverageError> {
        let state = self
            .rows
            .get_mut(key)
            .ok_or_else(|| CoverageError::UnknownRow { key: key.clone() })?;
        if state.recorded {
            return Err(CoverageError::AlreadyRecorded {
                key: key.clone(),
                status: state.status,
            });
        }
        *state = RowState {
            status,
            recorded: true,
        };
        Ok(())
    }

    /// Upgrade a row that failed in-process but passed externally.
    pub fn upgrade_external(&mut self, key: &RowKey, partial: bool) -> Result<(), CoverageError> {
        let state = self
            .rows
            .get_mut(key)
            .ok_or_else(|| CoverageError::UnknownRow { key: key.clone() })?;
        if state.status != CoverageStatus::UncoveredExecFail {
            return Err(CoverageError::NotUpgradable {
                key: key.clone(),
                status: state.status,
            });
        }
        state.status = if partial {
            CoverageStatus::PartialViaExternalExecution
        } else {
            CoverageStatus::CoveredViaExternalExecution
        };
        Ok(())
    }

    pub fn status(&self, key: &RowKey) -> Option<CoverageStatus> {
        self.rows.get(key).map(|s| s.status)
    }

    pub fn is_recorded(&self, key: &RowKey) -> bool {
        self.rows.get(key).is_some_and(|s| s.recorded)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, CoverageStatus)> {
        self.rows.iter().map(|(k, s)| (k, s.status))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows per status; statuses without rows are omitted.
    pub fn counts(&self) -> BTreeMap<CoverageStatus, usize> {
        let mut counts = BTreeMap::new();
        for (_, status) in self.iter() {
            *counts.entry(status).or_default() += 1;
        }
        counts
    }
}
