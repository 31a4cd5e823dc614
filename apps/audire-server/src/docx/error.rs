//! DOCX errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocxError {
    /// Not a readable ZIP package
    #[error("Invalid DOCX package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Part is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DocxResult<T> = std::result::Result<T, DocxError>;
