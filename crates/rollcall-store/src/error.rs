use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("only CSV format is currently supported (got {0:?})")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
