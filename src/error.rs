use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Fetch from {source_name} failed: {details}")]
    TransientFetch {
        source_name: String,
        details: String,
    },

    #[error("Deal {deal_id} has an unparseable {field}: {value:?}")]
    Data {
        deal_id: String,
        field: &'static str,
        value: Option<String>,
    },

    #[error("Row counter could not be read: {0}")]
    CounterUnreadable(String),

    #[error("Row counter at {path} is corrupt: {contents:?}")]
    CounterCorrupt { path: String, contents: String },

    #[error("Sheet is full: no empty row between {from_row} and {row_count}")]
    SheetFull { from_row: u32, row_count: u32 },

    #[error("Column index {0} is beyond the single-letter limit of 26 columns")]
    ColumnOutOfRange(usize),

    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Spreadsheet request failed: {0}")]
    Sheet(String),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// How far an error is allowed to travel before it is absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Degrades a single fetch to NA, or a rate lookup to absent.
    Transient,
    /// Degrades a single aggregation cell to NA.
    Data,
    /// Aborts the run.
    Fatal,
}

impl ReportError {
    pub fn severity(&self) -> Severity {
        match self {
            ReportError::TransientFetch { .. } => Severity::Transient,
            #[cfg(feature = "http")]
            ReportError::Http(_) => Severity::Transient,
            ReportError::Data { .. } => Severity::Data,
            _ => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub(crate) fn transient(source_name: &str, details: impl Into<String>) -> Self {
        ReportError::TransientFetch {
            source_name: source_name.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        assert_eq!(
            ReportError::transient("hubspot", "503").severity(),
            Severity::Transient
        );
        assert_eq!(
            ReportError::Data {
                deal_id: "42".to_string(),
                field: "amount",
                value: Some("abc".to_string()),
            }
            .severity(),
            Severity::Data
        );
        assert!(ReportError::SheetFull {
            from_row: 10,
            row_count: 9
        }
        .is_fatal());
        assert!(ReportError::CounterCorrupt {
            path: "rownumber.txt".to_string(),
            contents: "x".to_string(),
        }
        .is_fatal());
    }
}
