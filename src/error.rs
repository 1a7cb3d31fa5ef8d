use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to open {path}: {details}")]
    Open { path: String, details: String },

    #[error("Failed to read {what}: {details}")]
    Read { what: String, details: String },

    #[error("Billing extract is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Invalid value in row {row}, column '{column}': {details}")]
    InvalidRecord {
        row: usize,
        column: String,
        details: String,
    },

    #[error("Failed to write tracking workbook: {0}")]
    Write(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
