pub mod xml;

pub use xml::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("XML write error: {0}")]
    Write(String),

    #[error("Serialized output is not valid UTF-8")]
    Encoding,
}
