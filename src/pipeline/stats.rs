//! Per-run and per-stage execution statistics.

use serde::Serialize;
use std::time::Duration;

/// Timing and volume of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    /// Operation name
    pub name: String,

    /// Time spent applying this stage
    pub duration: Duration,

    /// Number of records the stage received
    pub records_processed: usize,
}

/// Diagnostics for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    /// Total wall-clock time of the run
    pub duration: Duration,

    /// Number of records handed to the first stage
    pub input_records: usize,

    /// Number of records leaving the last completed stage
    pub output_records: usize,

    /// Records removed by filter stages
    pub filtered_count: usize,

    /// One entry per executed stage, in chain order
    pub operations: Vec<OperationStats>,
}

impl ExecutionStats {
    pub(crate) fn starting_with(input_records: usize) -> Self {
        Self {
            input_records,
            output_records: input_records,
            ..Self::default()
        }
    }

    /// Number of stages that ran to completion.
    pub fn stages_completed(&self) -> usize {
        self.operations.len()
    }

    /// The stage that took the longest, if any ran.
    pub fn slowest_stage(&self) -> Option<&OperationStats> {
        self.operations.iter().max_by_key(|op| op.duration)
    }

    /// Create a summary message
    pub fn summary(&self) -> String {
        format!(
            "Pipeline completed: {} records ({} → {}), {} filtered, {} stages, {:.3}ms",
            if self.output_records > self.input_records {
                "added"
            } else if self.output_records < self.input_records {
                "removed"
            } else {
                "unchanged"
            },
            self.input_records,
            self.output_records,
            self.filtered_count,
            self.operations.len(),
            self.duration.as_secs_f64() * 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str, millis: u64, records: usize) -> OperationStats {
        OperationStats {
            name: name.to_owned(),
            duration: Duration::from_millis(millis),
            records_processed: records,
        }
    }

    #[test]
    fn test_summary() {
        let stats = ExecutionStats {
            duration: Duration::from_millis(2),
            input_records: 3,
            output_records: 2,
            filtered_count: 1,
            operations: vec![stage("filter", 1, 3), stage("sort", 1, 2)],
        };
        assert_eq!(
            stats.summary(),
            "Pipeline completed: removed records (3 → 2), 1 filtered, 2 stages, 2.000ms"
        );
    }

    #[test]
    fn test_slowest_stage() {
        let stats = ExecutionStats {
            operations: vec![stage("filter", 1, 3), stage("sort", 5, 2), stage("limit", 2, 2)],
            ..ExecutionStats::default()
        };
        assert_eq!(stats.slowest_stage().map(|s| s.name.as_str()), Some("sort"));
        assert_eq!(stats.stages_completed(), 3);
    }

    #[test]
    fn test_serializes_to_json() {
        let stats = ExecutionStats::starting_with(4);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["input_records"], 4);
        assert_eq!(json["output_records"], 4);
        assert!(json["operations"].as_array().unwrap().is_empty());
    }
}
