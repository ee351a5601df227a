//! Counters threaded explicitly through pool building and row coverage.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Building-block fragments offered to the pool.
    pub sequences_seen: usize,
    pub fully_parsed: usize,
    /// Fragments whose leading statements parsed before an error.
    pub partially_parsed: usize,
    /// Fragments that parsed to zero statements.
    pub skipped: usize,
    /// Fragments that failed to parse, by error kind.
    pub parse_errors: BTreeMap<String, usize>,
    /// Slices and prefixes dropped for touching non-public members.
    pub non_public_filtered: usize,
    /// Synthesis failures by category.
    pub synthesis_errors: BTreeMap<String, usize>,
    pub non_instantiable_types: BTreeSet<String>,
    /// Target signatures that could not be resolved or validated.
    pub unresolved_operations: BTreeSet<String>,
    pub executions: usize,
    pub execution_failures: usize,
    pub timeouts: usize,
    /// Exceptions thrown by executed sequences, by exception type.
    pub exceptions: BTreeMap<String, usize>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_parse_error(&mut self, kind: &str) {
        *self.parse_errors.entry(kind.to_string()).or_default() += 1;
    }

    pub fn record_synthesis_error(&mut self, kind: &str) {
        *self.synthesis_errors.entry(kind.to_string()).or_default() += 1;
    }

    pub fn record_exception(&mut self, type_name: &str) {
        *self.exceptions.entry(type_name.to_string()).or_default() += 1;
    }

    /// Fragments that raised a parse error, partially parsed ones included.
    pub fn parse_error_total(&self) -> usize {
        self.parse_errors.values().sum()
    }

    /// Fold another set of counters into this one.
    pub fn merge(&mut self, other: &RunDiagnostics) {
        self.sequences_seen += other.sequences_seen;
        self.fully_parsed += other.fully_parsed;
        self.partially_parsed += other.partially_parsed;
        self.skipped += other.skipped;
        for (k, v) in &other.parse_errors {
            *self.parse_errors.entry(k.clone()).or_default() += v;
        }
        self.non_public_filtered += other.non_public_filtered;
        for (k, v) in &other.synthesis_errors {
            *self.synthesis_errors.entry(k.clone()).or_default() += v;
        }
        self.non_instantiable_types
            .extend(other.non_instantiable_types.iter().cloned());
        self.unresolved_operations
            .extend(other.unresolved_operations.iter().cloned());
        self.executions += other.executions;
        self.execution_failures += other.execution_failures;
        self.timeouts += other.timeouts;
        for (k, v) in &other.exceptions {
            *self.exceptions.entry(k.clone()).or_default() += v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counts_and_unions_sets() {
        let mut a = RunDiagnostics::new();
        a.sequences_seen = 2;
        a.record_parse_error("resolution");
        a.non_instantiable_types.insert("com.acme.Foo".into());

        let mut b = RunDiagnostics::new();
        b.sequences_seen = 3;
        b.record_parse_error("resolution");
        b.record_parse_error("syntax");
        b.non_instantiable_types.insert("com.acme.Bar".into());

        a.merge(&b);
        assert_eq!(a.sequences_seen, 5);
        assert_eq!(a.parse_errors["resolution"], 2);
        assert_eq!(a.parse_error_total(), 3);
        assert_eq!(a.non_instantiable_types.len(), 2);
    }
}
