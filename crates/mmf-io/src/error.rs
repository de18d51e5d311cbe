//! Error types for mmf-io

use thiserror::Error;

use crate::tecplot::TecplotError;

pub type Result<T> = std::result::Result<T, MmfError>;

#[derive(Error, Debug)]
pub enum MmfError {
    #[error("Tecplot parse error: {0}")]
    Tecplot(#[from] TecplotError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
