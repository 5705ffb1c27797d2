//! 文件操作错误定义

use eskd_core::style::StyleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

impl From<FileError> for StyleError {
    fn from(error: FileError) -> Self {
        StyleError::Storage(error.to_string())
    }
}
