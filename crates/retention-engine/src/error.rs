/// Errors raised by the retention engine.
///
/// Every variant is terminal for the computation that raised it. Non-fatal
/// conditions (low expected counts, undefined lift) are reported as
/// [`Warning`](crate::compare::Warning)s on the result instead.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum EngineError {
    /// The table has no rows.
    #[display("no rows to analyze")]
    EmptyInput,
    /// A comparison needs exactly two distinct group labels.
    #[display("expected exactly 2 experiment groups, found {observed}: {labels:?}")]
    InvalidGroupCount {
        observed: usize,
        labels: Vec<String>,
    },
    /// One of the compared groups has no users, so its rate is undefined.
    #[display("experiment group '{group}' has no users")]
    ZeroCountGroup { group: String },
    /// The configured baseline label is not among the groups present.
    #[display("baseline group '{label}' not found in data (groups: {available:?})")]
    UnknownGroup {
        label: String,
        available: Vec<String>,
    },
    /// An analysis parameter is out of range.
    #[display("invalid analysis configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl EngineError {
    /// User-facing guidance on how to fix the input that caused this error.
    ///
    /// The three data failures map to distinct remediation paths: supplying
    /// data at all, checking the experiment's arm assignment, and collecting
    /// more users.
    #[must_use]
    pub fn remediation(&self) -> String {
        match self {
            EngineError::EmptyInput => {
                "No data: the dataset contains no valid rows. Upload a CSV with \
                 userid, version, retention_1 and retention_7 columns."
                    .to_owned()
            }
            EngineError::InvalidGroupCount { observed, .. } => format!(
                "Wrong number of groups: an A/B comparison needs exactly 2 experiment \
                 groups but the data has {observed}. Check the experiment configuration \
                 or filter the data to two arms."
            ),
            EngineError::ZeroCountGroup { group } => format!(
                "Insufficient group size: group '{group}' has no users. Collect data \
                 for both arms before comparing."
            ),
            EngineError::UnknownGroup { label, available } => format!(
                "Unknown baseline: '{label}' is not one of the groups in the data \
                 ({}). Choose one of those as the baseline.",
                available.join(", ")
            ),
            EngineError::InvalidConfig { reason } => {
                format!("Invalid settings: {reason}.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = EngineError::InvalidGroupCount {
            observed: 3,
            labels: vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.contains("found 3"));
        assert!(msg.contains("\"c\""));
    }

    #[test]
    fn test_remediation_distinguishes_failures() {
        let empty = EngineError::EmptyInput.remediation();
        let groups = EngineError::InvalidGroupCount {
            observed: 1,
            labels: vec!["a".to_owned()],
        }
        .remediation();
        let size = EngineError::ZeroCountGroup {
            group: "b".to_owned(),
        }
        .remediation();

        assert!(empty.starts_with("No data"));
        assert!(groups.starts_with("Wrong number of groups"));
        assert!(size.starts_with("Insufficient group size"));
    }
}
