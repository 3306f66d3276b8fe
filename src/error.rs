use std::io;
use thiserror::Error;

/// Every way a run can fail. The Display text is the single message shown to the user.
#[derive(Debug, Error)]
pub enum SalesError {
    #[error("An unexpected error occurred")]
    Unknown {
        #[source]
        source: Option<io::Error>,
    },
    #[error("Branch definition file does not exist")]
    FileNotFound,
    #[error("Branch definition file has an invalid format")]
    InvalidMasterFormat,
    #[error("Sales file names are not sequential")]
    NonSequentialFiles,
    #[error("{file} has an invalid format")]
    InvalidRecordFormat { file: String },
    #[error("{file} has an invalid branch code")]
    UnknownBranchCode { file: String },
    #[error("Total amount exceeded 10 digits")]
    AmountOverflow,
}

impl SalesError {
    pub fn unknown() -> Self {
        SalesError::Unknown { source: None }
    }
}

impl From<io::Error> for SalesError {
    fn from(source: io::Error) -> Self {
        SalesError::Unknown {
            source: Some(source),
        }
    }
}

impl From<csv::Error> for SalesError {
    fn from(error: csv::Error) -> Self {
        SalesError::from(io::Error::from(error))
    }
}
