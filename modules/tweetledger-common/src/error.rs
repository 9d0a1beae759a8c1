use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rebuild row count mismatch: read {read} rows, rebuilt {rebuilt}")]
    RowCountMismatch { read: usize, rebuilt: usize },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
